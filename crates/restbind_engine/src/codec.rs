//! Conversion between editing-surface controls and JSON values.
//!
//! Each named control is resolved once to a [`FieldKind`]; reads and writes
//! dispatch on that kind only, never on the value being converted.

use crate::surface::{ControlSpec, ControlType, ControlValue};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How a control converts to and from a record value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Checkbox bound to a boolean.
    Boolean,
    /// Date control bound to a `YYYY-MM-DD` date.
    Date,
    /// Free text holding a JSON document.
    JsonText,
    /// Free text holding one string per line.
    ArrayText,
    /// Selection list bound to an item identity.
    Select,
    /// Any other control, bound to a string.
    Plain,
}

impl FieldKind {
    /// Resolves the kind of a control from its type and format tag.
    pub fn resolve(spec: &ControlSpec) -> Self {
        match spec.control {
            ControlType::Checkbox => FieldKind::Boolean,
            ControlType::Date => FieldKind::Date,
            ControlType::Select => FieldKind::Select,
            ControlType::Text | ControlType::Textarea => match spec.format.as_deref() {
                Some(tag) if tag.eq_ignore_ascii_case("json") => FieldKind::JsonText,
                Some(tag) if tag.eq_ignore_ascii_case("array") => FieldKind::ArrayText,
                _ => FieldKind::Plain,
            },
        }
    }
}

/// A named control with its resolved kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// Control name, used as the record path.
    pub name: String,
    /// Resolved conversion kind.
    pub kind: FieldKind,
}

/// Binds every named control. Unnamed controls are dropped.
pub fn bind(controls: &[ControlSpec]) -> Vec<FieldBinding> {
    controls
        .iter()
        .filter_map(|spec| {
            let name = spec.name.as_deref().filter(|name| !name.is_empty())?;
            Some(FieldBinding {
                name: name.to_string(),
                kind: FieldKind::resolve(spec),
            })
        })
        .collect()
}

/// Converts a record value to what the control displays.
///
/// `identity_field` is used by [`FieldKind::Select`] to reduce an object to
/// its identity.
pub fn encode(kind: FieldKind, value: Option<&Value>, identity_field: &str) -> ControlValue {
    match kind {
        FieldKind::Boolean => ControlValue::Checked(value.is_some_and(truthy)),
        FieldKind::Date => ControlValue::Text(value.and_then(to_date).unwrap_or_default()),
        FieldKind::JsonText => ControlValue::Text(match value {
            None => String::new(),
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_default(),
        }),
        FieldKind::ArrayText => ControlValue::Text(match value {
            Some(Value::Array(lines)) => lines
                .iter()
                .map(|line| display_text(Some(line)))
                .collect::<Vec<_>>()
                .join("\n"),
            other => display_text(other),
        }),
        FieldKind::Select => ControlValue::Text(match value {
            Some(Value::Object(map)) => display_text(map.get(identity_field)),
            other => display_text(other),
        }),
        FieldKind::Plain => ControlValue::Text(display_text(value)),
    }
}

/// Converts what the control displays back to a record value.
///
/// `None` means the field is left out of the record.
pub fn decode(kind: FieldKind, control: &ControlValue) -> Option<Value> {
    let text = match control {
        ControlValue::Checked(checked) => {
            return match kind {
                FieldKind::Boolean => Some(Value::Bool(*checked)),
                _ => None,
            };
        }
        ControlValue::Text(text) => text.as_str(),
    };

    match kind {
        FieldKind::Boolean => Some(Value::Bool(!text.is_empty())),
        FieldKind::Date => {
            if text.trim().is_empty() {
                return None;
            }
            parse_date(text.trim()).map(|date| Value::String(date.format(DATE_FORMAT).to_string()))
        }
        FieldKind::JsonText => serde_json::from_str(text).ok(),
        FieldKind::ArrayText => Some(Value::Array(
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| Value::String(line.to_string()))
                .collect(),
        )),
        FieldKind::Select | FieldKind::Plain => {
            (!text.is_empty()).then(|| Value::String(text.to_string()))
        }
    }
}

/// Renders a value as plain display text.
///
/// Strings are shown verbatim, null and absent values as empty text and
/// everything else as compact JSON.
pub fn display_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn to_date(value: &Value) -> Option<String> {
    let date = match value {
        Value::String(text) => parse_date(text.trim())?,
        Value::Number(millis) => DateTime::from_timestamp_millis(millis.as_i64()?)?.date_naive(),
        _ => return None,
    };
    Some(date.format(DATE_FORMAT).to_string())
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn text(value: &str) -> ControlValue {
        ControlValue::Text(value.to_string())
    }

    #[test]
    fn resolve_kinds() {
        let cases = [
            (ControlSpec::named("a", ControlType::Checkbox), FieldKind::Boolean),
            (ControlSpec::named("a", ControlType::Date), FieldKind::Date),
            (ControlSpec::named("a", ControlType::Select), FieldKind::Select),
            (ControlSpec::named("a", ControlType::Text), FieldKind::Plain),
            (
                ControlSpec::named("a", ControlType::Textarea).with_format("JSON"),
                FieldKind::JsonText,
            ),
            (
                ControlSpec::named("a", ControlType::Textarea).with_format("array"),
                FieldKind::ArrayText,
            ),
            (
                ControlSpec::named("a", ControlType::Checkbox).with_format("json"),
                FieldKind::Boolean,
            ),
        ];
        for (spec, expected) in cases {
            assert_eq!(FieldKind::resolve(&spec), expected, "{spec:?}");
        }
    }

    #[test]
    fn bind_drops_unnamed_controls() {
        let controls = vec![
            ControlSpec::named("id", ControlType::Text),
            ControlSpec::unnamed(ControlType::Text),
            ControlSpec {
                name: Some(String::new()),
                control: ControlType::Text,
                format: None,
            },
            ControlSpec::named("tags", ControlType::Textarea).with_format("array"),
        ];
        let bound = bind(&controls);
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[1].kind, FieldKind::ArrayText);
    }

    #[test]
    fn boolean_field() {
        assert_eq!(
            encode(FieldKind::Boolean, Some(&json!(true)), "id"),
            ControlValue::Checked(true)
        );
        assert_eq!(encode(FieldKind::Boolean, None, "id"), ControlValue::Checked(false));
        assert_eq!(
            decode(FieldKind::Boolean, &ControlValue::Checked(false)),
            Some(json!(false))
        );
    }

    #[test]
    fn date_field() {
        assert_eq!(
            encode(FieldKind::Date, Some(&json!("2024-03-05")), "id"),
            text("2024-03-05")
        );
        assert_eq!(
            encode(FieldKind::Date, Some(&json!("2024-03-05T10:30:00Z")), "id"),
            text("2024-03-05")
        );
        assert_eq!(encode(FieldKind::Date, None, "id"), text(""));
        assert_eq!(encode(FieldKind::Date, Some(&json!("soon")), "id"), text(""));

        assert_eq!(decode(FieldKind::Date, &text("2024-03-05")), Some(json!("2024-03-05")));
        assert_eq!(decode(FieldKind::Date, &text("")), None);
    }

    #[test]
    fn array_field_round_trip() {
        let shown = encode(FieldKind::ArrayText, Some(&json!(["x", "y"])), "id");
        assert_eq!(shown, text("x\ny"));
        assert_eq!(decode(FieldKind::ArrayText, &shown), Some(json!(["x", "y"])));
    }

    #[test]
    fn array_field_drops_blank_lines_and_passes_scalars() {
        assert_eq!(
            decode(FieldKind::ArrayText, &text("a\n\n  \nb\n")),
            Some(json!(["a", "b"]))
        );
        assert_eq!(
            encode(FieldKind::ArrayText, Some(&json!("single")), "id"),
            text("single")
        );
    }

    #[test]
    fn json_field() {
        let shown = encode(FieldKind::JsonText, Some(&json!({"a": [1, 2]})), "id");
        assert!(shown.as_text().unwrap().contains('\n'));
        assert_eq!(decode(FieldKind::JsonText, &shown), Some(json!({"a": [1, 2]})));

        assert_eq!(decode(FieldKind::JsonText, &text("{not json")), None);
        assert_eq!(decode(FieldKind::JsonText, &text("")), None);
        assert_eq!(decode(FieldKind::JsonText, &text("null")), Some(Value::Null));
    }

    #[test]
    fn select_field_uses_identity() {
        let owner = json!({"key": "u7", "name": "Ann"});
        assert_eq!(encode(FieldKind::Select, Some(&owner), "key"), text("u7"));
        assert_eq!(encode(FieldKind::Select, Some(&json!(3)), "key"), text("3"));
        assert_eq!(decode(FieldKind::Select, &text("u7")), Some(json!("u7")));
        assert_eq!(decode(FieldKind::Select, &text("")), None);
    }

    #[test]
    fn plain_field() {
        assert_eq!(encode(FieldKind::Plain, None, "id"), text(""));
        assert_eq!(encode(FieldKind::Plain, Some(&Value::Null), "id"), text(""));
        assert_eq!(encode(FieldKind::Plain, Some(&json!(42)), "id"), text("42"));
        assert_eq!(decode(FieldKind::Plain, &text("")), None);
        assert_eq!(decode(FieldKind::Plain, &text("Foo")), Some(json!("Foo")));
    }

    proptest! {
        #[test]
        fn array_lines_round_trip(lines in prop::collection::vec("[a-z0-9][a-z0-9 ]{0,8}", 0..6)) {
            let value = json!(lines);
            let shown = encode(FieldKind::ArrayText, Some(&value), "id");
            prop_assert_eq!(decode(FieldKind::ArrayText, &shown), Some(value));
        }
    }
}
