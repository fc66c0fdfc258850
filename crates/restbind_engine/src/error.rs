//! Error types for the binding engine.

use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for engine actions.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while validating a [`BindingConfig`](crate::BindingConfig).
///
/// These are fatal: the engine is never constructed when one occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The endpoint URL is empty.
    #[error("endpoint must not be empty")]
    MissingEndpoint,

    /// No listing columns were configured.
    #[error("at least one listing column is required")]
    MissingColumns,

    /// A listing column path is blank or has an empty segment.
    #[error("invalid column path {0:?}")]
    InvalidColumn(String),

    /// The identity field name is empty.
    #[error("identity field must not be empty")]
    MissingIdentityField,

    /// The editing surface has no control named after the identity field.
    #[error("editing surface has no control named {0:?}")]
    MissingIdentityControl(String),

    /// A header name or value cannot be sent.
    #[error("malformed header {name:?}: {reason}")]
    InvalidHeader {
        /// Header name as configured.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The pagination increment is zero.
    #[error("page increment must be greater than zero")]
    InvalidIncrement,
}

/// Errors that can occur while running an engine action.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a failure status.
    #[error("server returned {status}: {}", describe_body(.body))]
    Http {
        /// HTTP status code.
        status: u16,
        /// Parsed response body (null when empty).
        body: Value,
    },

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// A pre-hook failed and the action was aborted.
    #[error("{hook} aborted: {message}")]
    HookAbort {
        /// Lifecycle point that failed.
        hook: &'static str,
        /// Failure message from the hook.
        message: String,
    },

    /// Delete was requested without an identity.
    #[error("nothing selected")]
    NothingSelected,

    /// The server had no item for the requested identity.
    #[error("item {id} not found")]
    NotFound {
        /// Requested identity.
        id: String,
    },
}

impl SyncError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns true for failures that are recovered at the action boundary
    /// and reported as status.
    pub fn is_transport_like(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_)
                | SyncError::Http { .. }
                | SyncError::Decode(_)
                | SyncError::HookAbort { .. }
        )
    }

    /// Returns the HTTP status for server failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the per-field error payload of a server failure.
    ///
    /// Looks for an `errors` object, then an `error` object. Any other body
    /// names no fields.
    pub fn field_errors(&self) -> Option<&Map<String, Value>> {
        let SyncError::Http { body, .. } = self else {
            return None;
        };
        let body = body.as_object()?;
        ["errors", "error"]
            .into_iter()
            .find_map(|key| body.get(key).and_then(Value::as_object))
    }
}

fn describe_body(body: &Value) -> String {
    match body {
        Value::Null => "no body".to_string(),
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            for key in ["error", "message", "detail"] {
                if let Some(Value::String(text)) = map.get(key) {
                    return text.clone();
                }
            }
            body.to_string()
        }
        other => other.to_string(),
    }
}

/// Failure signalled by a lifecycle hook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a hook error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
