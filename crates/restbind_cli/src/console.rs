//! Text surfaces for the terminal.

use crate::error::{CliError, CliResult};
use restbind_engine::{
    ControlSpec, ControlType, ControlValue, EditingSurface, ListingSurface, PageStatus, Row,
    SyncEngine,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Engine driving the console surfaces.
pub type ConsoleEngine<T> = SyncEngine<T, ConsoleListing, ConsoleForm>;

/// Listing surface rendered as a text table.
#[derive(Debug, Default)]
pub struct ConsoleListing {
    columns: Vec<String>,
    rows: Vec<Row>,
    selected: Option<String>,
    page: Option<PageStatus>,
}

impl ConsoleListing {
    /// Creates a listing with the given column headings.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Renders the table, marking the selected row with `*`.
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.text.chars().count());
            }
        }

        let mut out = String::new();
        let headings: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        render_line(&mut out, ' ', &headings, &widths);
        for row in &self.rows {
            let selected = row.identity.is_some() && row.identity == self.selected;
            let cells: Vec<&str> = row.cells.iter().map(|c| c.text.as_str()).collect();
            render_line(&mut out, if selected { '*' } else { ' ' }, &cells, &widths);
        }

        if let Some(page) = self.page {
            let _ = match page.pages {
                Some(pages) => writeln!(out, "page {} of {}", page.page, pages),
                None => writeln!(out, "page {}", page.page),
            };
        }
        out
    }
}

fn render_line(out: &mut String, marker: char, cells: &[&str], widths: &[usize]) {
    let mut line = String::from(marker);
    for (cell, width) in cells.iter().zip(widths) {
        let _ = write!(line, " {cell:<width$}");
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

impl ListingSurface for ConsoleListing {
    fn replace_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
    }

    fn mark_selected(&mut self, identity: Option<&str>) {
        self.selected = identity.map(str::to_string);
    }

    fn set_pagination(&mut self, status: PageStatus) {
        self.page = Some(status);
    }
}

/// Editing surface holding values set from the command line.
#[derive(Debug, Default)]
pub struct ConsoleForm {
    controls: Vec<ControlSpec>,
    values: BTreeMap<String, ControlValue>,
    invalid: BTreeSet<String>,
}

impl ConsoleForm {
    /// Creates a form with the given controls.
    pub fn new(controls: Vec<ControlSpec>) -> Self {
        Self {
            controls,
            ..Self::default()
        }
    }

    /// Applies a `path=value` assignment.
    ///
    /// Checkboxes accept `true`/`false`, `yes`/`no`, `on`/`off` and `1`/`0`.
    pub fn assign(&mut self, assignment: &str) -> CliResult<()> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| CliError::InvalidAssignment(assignment.to_string()))?;
        let spec = self
            .controls
            .iter()
            .find(|spec| spec.name.as_deref() == Some(name))
            .ok_or_else(|| CliError::UnknownControl(name.to_string()))?;

        let value = match spec.control {
            ControlType::Checkbox => ControlValue::Checked(
                parse_flag(value)
                    .ok_or_else(|| CliError::InvalidAssignment(assignment.to_string()))?,
            ),
            // One entry per line on the form, comma-separated on the command line.
            _ if is_array(spec) => ControlValue::Text(value.replace(',', "\n")),
            _ => ControlValue::Text(value.to_string()),
        };
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Renders every named control as `name: value`. Rejected controls are
    /// prefixed with `!`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for name in self.controls.iter().filter_map(|spec| spec.name.as_deref()) {
            if self.invalid.contains(name) {
                out.push('!');
            }
            let _ = match self.read(name) {
                ControlValue::Checked(checked) => {
                    writeln!(out, "{name}: [{}]", if checked { 'x' } else { ' ' })
                }
                ControlValue::Text(text) if text.contains('\n') => {
                    let indented = text.replace('\n', "\n  ");
                    writeln!(out, "{name}:\n  {indented}")
                }
                ControlValue::Text(text) => writeln!(out, "{name}: {text}"),
            };
        }
        out
    }
}

fn is_array(spec: &ControlSpec) -> bool {
    spec.format
        .as_deref()
        .is_some_and(|format| format.eq_ignore_ascii_case("array"))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

impl EditingSurface for ConsoleForm {
    fn controls(&self) -> Vec<ControlSpec> {
        self.controls.clone()
    }

    fn read(&self, name: &str) -> ControlValue {
        if let Some(value) = self.values.get(name) {
            return value.clone();
        }
        let checkbox = self.controls.iter().any(|spec| {
            spec.name.as_deref() == Some(name) && spec.control == ControlType::Checkbox
        });
        if checkbox {
            ControlValue::Checked(false)
        } else {
            ControlValue::Text(String::new())
        }
    }

    fn write(&mut self, name: &str, value: ControlValue) {
        self.values.insert(name.to_string(), value);
    }

    fn set_invalid(&mut self, name: &str, invalid: bool) {
        if invalid {
            self.invalid.insert(name.to_string());
        } else {
            self.invalid.remove(name);
        }
    }

    fn is_disabled(&self, _name: &str) -> bool {
        false
    }
}
