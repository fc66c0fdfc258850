//! Delete command implementation.

use super::with_status;
use crate::console::ConsoleEngine;
use crate::error::CliResult;
use restbind_engine::Transport;

/// Runs the delete command.
pub async fn run<T: Transport>(engine: &ConsoleEngine<T>, id: &str) -> CliResult<String> {
    engine.select_by_id(id).await?;
    engine.delete_selected().await?;
    Ok(with_status(engine, String::new()))
}
