//! Contracts for the listing and editing surfaces.
//!
//! The engine never renders anything itself. It talks to the screen through
//! these two traits, and the screen routes gestures back by calling the
//! engine's action methods (a row click becomes
//! [`SyncEngine::select_by_id`](crate::SyncEngine::select_by_id) with the
//! row's [`Row::identity`]).

use serde::{Deserialize, Serialize};

/// One rendered cell of a listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Display text.
    pub text: String,
    /// Optional style tag configured for the column.
    pub style: Option<String>,
}

/// One row of the listing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Identity value the row's selection gesture is keyed by.
    pub identity: Option<String>,
    /// One cell per configured column, in column order.
    pub cells: Vec<Cell>,
}

/// Pagination status shown next to the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStatus {
    /// 1-based current page.
    pub page: u64,
    /// 1-based page count, `None` when the total is unknown.
    pub pages: Option<u64>,
    /// Whether the previous-page control is enabled.
    pub has_previous: bool,
    /// Whether the next-page control is enabled.
    pub has_next: bool,
}

/// The surface that displays multiple items as rows.
pub trait ListingSurface {
    /// Replaces every row. Called with the full result of each search.
    fn replace_rows(&mut self, rows: Vec<Row>);

    /// Marks the row with the given identity as selected, or clears the mark.
    fn mark_selected(&mut self, identity: Option<&str>);

    /// Updates the pagination display and next/previous controls.
    fn set_pagination(&mut self, status: PageStatus);
}

/// Control types an editing surface can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    /// Checkbox.
    Checkbox,
    /// Date picker.
    Date,
    /// Selection list.
    Select,
    /// Multi-line text.
    Textarea,
    /// Single-line text.
    Text,
}

/// Bind-time description of one editing-surface control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSpec {
    /// Control name (a dotted path into the record). Unnamed controls are
    /// never read or written.
    pub name: Option<String>,
    /// Control type.
    #[serde(rename = "type")]
    pub control: ControlType,
    /// Format tag for free-text controls (`"json"` or `"array"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ControlSpec {
    /// Creates a named control.
    pub fn named(name: impl Into<String>, control: ControlType) -> Self {
        Self {
            name: Some(name.into()),
            control,
            format: None,
        }
    }

    /// Creates a control without a name.
    pub fn unnamed(control: ControlType) -> Self {
        Self {
            name: None,
            control,
            format: None,
        }
    }

    /// Sets the format tag.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// On-screen value of a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    /// Text content (text, textarea, date, select).
    Text(String),
    /// Checked state (checkbox).
    Checked(bool),
}

impl ControlValue {
    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ControlValue::Text(text) => Some(text),
            ControlValue::Checked(_) => None,
        }
    }
}

/// The surface that displays one item's fields for editing.
pub trait EditingSurface {
    /// Describes every control. Called once when the engine is constructed.
    fn controls(&self) -> Vec<ControlSpec>;

    /// Reads a control's current value. Unknown names read as empty text.
    fn read(&self, name: &str) -> ControlValue;

    /// Writes a control's value.
    fn write(&mut self, name: &str, value: ControlValue);

    /// Marks a control invalid or clears the mark.
    fn set_invalid(&mut self, name: &str, invalid: bool);

    /// Returns whether a control is disabled.
    fn is_disabled(&self, name: &str) -> bool;
}
