//! Binding file loading.
//!
//! A binding file is the engine configuration in JSON plus the CLI's own
//! settings:
//!
//! ```json
//! {
//!   "baseUrl": "https://example.com",
//!   "endpoint": "/api/widgets",
//!   "columns": ["id", "name"],
//!   "controls": [
//!     {"name": "id", "type": "text"},
//!     {"name": "name", "type": "text"},
//!     {"name": "tags", "type": "text", "format": "array"}
//!   ]
//! }
//! ```

use crate::error::{CliError, CliResult};
use restbind_engine::{BindingConfig, ControlSpec, ControlType};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of a binding file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Prefix for endpoints that are not absolute URLs.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Editing-surface controls. Derived from the columns when empty.
    #[serde(default)]
    pub controls: Vec<ControlSpec>,
    /// Engine configuration.
    #[serde(flatten)]
    pub binding: BindingConfig,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl CliConfig {
    /// Loads a binding file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Adds a `NAME:VALUE` header.
    pub fn with_header_arg(mut self, arg: &str) -> CliResult<Self> {
        let (name, value) = arg
            .split_once(':')
            .map(|(name, value)| (name.trim(), value.trim()))
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| CliError::InvalidHeader(arg.to_string()))?;
        self.binding = self.binding.with_header(name, value);
        Ok(self)
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the configured controls, or text controls for the identity
    /// field and every column.
    pub fn controls(&self) -> Vec<ControlSpec> {
        if !self.controls.is_empty() {
            return self.controls.clone();
        }
        let mut names = vec![self.binding.identity_field.clone()];
        for column in &self.binding.columns {
            if !names.contains(column) {
                names.push(column.clone());
            }
        }
        names
            .into_iter()
            .map(|name| ControlSpec::named(name, ControlType::Text))
            .collect()
    }
}
