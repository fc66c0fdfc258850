//! CLI command implementations.
//!
//! Each command drives engine actions and returns the text to print.

pub mod create;
pub mod delete;
pub mod list;
pub mod show;
pub mod update;

use crate::console::ConsoleEngine;
use restbind_engine::Transport;

/// Appends the last status to rendered surface text.
fn with_status<T: Transport>(engine: &ConsoleEngine<T>, mut out: String) -> String {
    if let Some(status) = engine.last_status() {
        out.push_str(&status.to_string());
        out.push('\n');
    }
    out
}
