//! List command implementation.

use super::with_status;
use crate::console::ConsoleEngine;
use crate::error::CliResult;
use restbind_engine::Transport;

/// Runs the list command: searches, then pages forward to `page` (1-based).
pub async fn run<T: Transport>(
    engine: &ConsoleEngine<T>,
    search: Option<&str>,
    page: u64,
) -> CliResult<String> {
    engine.search(search).await?;
    for _ in 1..page {
        engine.next_page().await?;
    }

    let listing = engine.listing().render();
    Ok(with_status(engine, listing))
}
