//! Update command implementation.

use super::with_status;
use crate::console::ConsoleEngine;
use crate::error::CliResult;
use restbind_engine::Transport;

/// Runs the update command: loads the item, applies the assignments and
/// saves it.
pub async fn run<T: Transport>(
    engine: &ConsoleEngine<T>,
    id: &str,
    assignments: &[String],
) -> CliResult<String> {
    engine.select_by_id(id).await?;
    {
        let mut form = engine.editing();
        for assignment in assignments {
            form.assign(assignment)?;
        }
    }
    engine.save().await?;
    let form = engine.editing().render();
    Ok(with_status(engine, form))
}
