//! Human-readable status reporting.

use crate::error::SyncError;
use parking_lot::Mutex;
use std::fmt;
use tracing::{info, warn};

/// Severity of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// Normal progress.
    Info,
    /// A problem that did not fail the action.
    Warning,
    /// The action failed.
    Error,
}

/// A status message with optional detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Severity.
    pub level: StatusLevel,
    /// Short message, e.g. `"Saved Foo"` or `"save failed"`.
    pub message: String,
    /// Longer detail, typically the error text.
    pub detail: Option<String>,
}

impl Status {
    /// Creates an informational status.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            message: message.into(),
            detail: None,
        }
    }

    /// Creates a warning status with detail.
    pub fn warning(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Warning,
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// Creates an error status for a failed action.
    pub fn failure(action: &str, error: &SyncError) -> Self {
        Self {
            level: StatusLevel::Error,
            message: format!("{action} failed"),
            detail: Some(error.to_string()),
        }
    }

    /// Returns true for error statuses.
    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.message, detail),
            None => f.write_str(&self.message),
        }
    }
}

/// Receives statuses, e.g. a status bar.
pub trait StatusSink: Send + Sync {
    /// Shows a status.
    fn report(&self, status: &Status);
}

impl<F> StatusSink for F
where
    F: Fn(&Status) + Send + Sync,
{
    fn report(&self, status: &Status) {
        self(status)
    }
}

/// Logs every status and forwards it to the attached sinks.
#[derive(Default)]
pub struct StatusReporter {
    sinks: Vec<Box<dyn StatusSink>>,
    last: Mutex<Option<Status>>,
}

impl StatusReporter {
    /// Creates a reporter that only logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a sink.
    pub fn with_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Reports a status.
    pub fn report(&self, status: Status) {
        match status.level {
            StatusLevel::Info => info!(status = %status, "status"),
            StatusLevel::Warning | StatusLevel::Error => warn!(status = %status, "status"),
        }
        for sink in &self.sinks {
            sink.report(&status);
        }
        *self.last.lock() = Some(status);
    }

    /// Returns the last reported status.
    pub fn last(&self) -> Option<Status> {
        self.last.lock().clone()
    }
}

impl fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReporter")
            .field("sinks", &self.sinks.len())
            .field("last", &self.last.lock())
            .finish()
    }
}
