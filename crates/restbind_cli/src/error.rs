//! CLI error type.

use restbind_engine::{ConfigError, SyncError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the CLI.
#[derive(Error, Debug)]
pub enum CliError {
    /// The binding file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The binding file is not valid JSON for a binding.
    #[error("invalid binding file {path:?}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The binding was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An engine action failed.
    #[error(transparent)]
    Action(#[from] SyncError),

    /// The HTTP client could not be built.
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),

    /// A `--header` argument was not `NAME:VALUE`.
    #[error("invalid header {0:?}, expected NAME:VALUE")]
    InvalidHeader(String),

    /// A `--set` argument was not `path=value`.
    #[error("invalid assignment {0:?}, expected path=value")]
    InvalidAssignment(String),

    /// A `--set` argument named a control the form does not have.
    #[error("no control named {0:?}")]
    UnknownControl(String),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
