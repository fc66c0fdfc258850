//! Normalization of heterogeneous response shapes.
//!
//! Servers answer with a bare array, a bare object, `{"results": [...]}` or
//! an empty body. Every network boundary in the engine goes through
//! [`unwrap_list`] or [`unwrap_single`] so the actions only ever see a list,
//! one item, or nothing.

use crate::error::{SyncError, SyncResult};
use crate::path;
use crate::transport::HttpResponse;
use serde_json::Value;

const RESULTS_KEY: &str = "results";

/// A normalized list response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListResult {
    /// The items, possibly empty.
    pub items: Vec<Value>,
    /// Total item count, when a total path is configured.
    pub total: Option<u64>,
}

/// Normalizes a list-mode response.
///
/// With `total_path` set, the value at that dotted path becomes
/// [`ListResult::total`], defaulting to 0 when missing or not a number.
pub fn unwrap_list(response: &HttpResponse, total_path: Option<&str>) -> SyncResult<ListResult> {
    if response.status == 204 {
        return Ok(ListResult {
            items: Vec::new(),
            total: total_path.map(|_| 0),
        });
    }
    let body = parse(response)?;
    let total = total_path.map(|path| path::get(&body, path).and_then(as_count).unwrap_or(0));
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(RESULTS_KEY) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(ListResult { items, total })
}

/// Normalizes a single-item response. `None` means no item.
pub fn unwrap_single(response: &HttpResponse) -> SyncResult<Option<Value>> {
    if response.status == 204 {
        return Ok(None);
    }
    let item = match parse(response)? {
        Value::Array(items) => items.into_iter().next(),
        Value::Object(mut map) => match map.remove(RESULTS_KEY) {
            Some(Value::Array(items)) => items.into_iter().next(),
            Some(other) => {
                map.insert(RESULTS_KEY.to_string(), other);
                Some(Value::Object(map))
            }
            None => Some(Value::Object(map)),
        },
        Value::Null => None,
        other => Some(other),
    };
    Ok(item)
}

/// Parses the body and raises it as the error value on a failure status.
fn parse(response: &HttpResponse) -> SyncResult<Value> {
    if response.is_success() {
        return response.json();
    }
    // A failure body that is not JSON is still surfaced, as text.
    let body = response
        .json()
        .unwrap_or_else(|_| Value::String(response.body.clone()));
    Err(SyncError::Http {
        status: response.status,
        body,
    })
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
