//! Recording surfaces.
//!
//! Implementations of the listing and editing surface contracts that keep
//! everything the engine does to them, so tests can assert on what a user
//! would see.

use restbind_engine::{
    Cell, ControlSpec, ControlType, ControlValue, EditingSurface, ListingSurface, PageStatus, Row,
};
use std::collections::{BTreeMap, BTreeSet};

/// A listing surface that records rows, selection and pagination.
#[derive(Debug, Default)]
pub struct RecordingListing {
    rows: Vec<Row>,
    selected: Option<String>,
    page: Option<PageStatus>,
    renders: usize,
}

impl RecordingListing {
    /// Creates an empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rendered rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the cell text of every row.
    pub fn texts(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.cells.iter().map(|cell| cell.text.clone()).collect())
            .collect()
    }

    /// Returns the identity of every row.
    pub fn identities(&self) -> Vec<Option<String>> {
        self.rows.iter().map(|row| row.identity.clone()).collect()
    }

    /// Returns the first cell of the given column index in every row.
    pub fn column(&self, index: usize) -> Vec<Cell> {
        self.rows
            .iter()
            .filter_map(|row| row.cells.get(index).cloned())
            .collect()
    }

    /// Returns the identity marked selected.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Returns the last pagination status.
    pub fn page(&self) -> Option<PageStatus> {
        self.page
    }

    /// Returns how many times the rows were replaced.
    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl ListingSurface for RecordingListing {
    fn replace_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.renders += 1;
    }

    fn mark_selected(&mut self, identity: Option<&str>) {
        self.selected = identity.map(str::to_string);
    }

    fn set_pagination(&mut self, status: PageStatus) {
        self.page = Some(status);
    }
}

/// An editing surface holding control values in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingForm {
    controls: Vec<ControlSpec>,
    values: BTreeMap<String, ControlValue>,
    invalid: BTreeSet<String>,
    disabled: BTreeSet<String>,
    writes: usize,
}

impl RecordingForm {
    /// Creates a form without controls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a control.
    pub fn control(mut self, spec: ControlSpec) -> Self {
        if let Some(name) = &spec.name {
            let initial = match spec.control {
                ControlType::Checkbox => ControlValue::Checked(false),
                _ => ControlValue::Text(String::new()),
            };
            self.values.insert(name.clone(), initial);
        }
        self.controls.push(spec);
        self
    }

    /// Adds a single-line text control.
    pub fn text(self, name: &str) -> Self {
        self.control(ControlSpec::named(name, ControlType::Text))
    }

    /// Adds a multi-line text control.
    pub fn textarea(self, name: &str) -> Self {
        self.control(ControlSpec::named(name, ControlType::Textarea))
    }

    /// Adds a checkbox.
    pub fn checkbox(self, name: &str) -> Self {
        self.control(ControlSpec::named(name, ControlType::Checkbox))
    }

    /// Adds a date picker.
    pub fn date(self, name: &str) -> Self {
        self.control(ControlSpec::named(name, ControlType::Date))
    }

    /// Adds a selection list.
    pub fn select(self, name: &str) -> Self {
        self.control(ControlSpec::named(name, ControlType::Select))
    }

    /// Adds a multi-line control holding JSON text.
    pub fn json(self, name: &str) -> Self {
        self.control(ControlSpec::named(name, ControlType::Textarea).with_format("json"))
    }

    /// Adds a text control holding comma-separated values.
    pub fn array(self, name: &str) -> Self {
        self.control(ControlSpec::named(name, ControlType::Text).with_format("array"))
    }

    /// Adds a control without a name.
    pub fn unnamed(self, control: ControlType) -> Self {
        self.control(ControlSpec::unnamed(control))
    }

    /// Disables a control.
    pub fn disabled(mut self, name: &str) -> Self {
        self.disabled.insert(name.to_string());
        self
    }

    /// Types text into a control, as a user would.
    pub fn set_text(&mut self, name: &str, text: &str) {
        self.values
            .insert(name.to_string(), ControlValue::Text(text.to_string()));
    }

    /// Ticks or clears a checkbox, as a user would.
    pub fn set_checked(&mut self, name: &str, checked: bool) {
        self.values
            .insert(name.to_string(), ControlValue::Checked(checked));
    }

    /// Returns a control's value.
    pub fn value(&self, name: &str) -> ControlValue {
        self.read(name)
    }

    /// Returns a control's text, empty for checkboxes.
    pub fn text_of(&self, name: &str) -> String {
        self.read(name).as_text().unwrap_or_default().to_string()
    }

    /// Returns whether a control is marked invalid.
    pub fn is_invalid(&self, name: &str) -> bool {
        self.invalid.contains(name)
    }

    /// Returns the names of every invalid control.
    pub fn invalid(&self) -> Vec<String> {
        self.invalid.iter().cloned().collect()
    }

    /// Returns how many control writes the form received.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl EditingSurface for RecordingForm {
    fn controls(&self) -> Vec<ControlSpec> {
        self.controls.clone()
    }

    fn read(&self, name: &str) -> ControlValue {
        self.values
            .get(name)
            .cloned()
            .unwrap_or_else(|| ControlValue::Text(String::new()))
    }

    fn write(&mut self, name: &str, value: ControlValue) {
        self.values.insert(name.to_string(), value);
        self.writes += 1;
    }

    fn set_invalid(&mut self, name: &str, invalid: bool) {
        if invalid {
            self.invalid.insert(name.to_string());
        } else {
            self.invalid.remove(name);
        }
    }

    fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }
}
