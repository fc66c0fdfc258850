//! Property-based test generators using proptest.
//!
//! Strategies for records, dotted paths and search terms.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Strategy for a single path segment.
pub fn segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,7}").expect("Invalid regex")
}

/// Strategy for dotted paths of one to four segments.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..=4).prop_map(|segments| segments.join("."))
}

/// Strategy for JSON leaf values.
pub fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for nested JSON records up to three levels deep.
pub fn record_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(3, 32, 4, |inner| {
        prop::collection::btree_map(segment_strategy(), inner, 0..4)
            .prop_map(|map| Value::Object(map.into_iter().collect::<Map<String, Value>>()))
    })
}

/// Strategy for search terms, including the empty term.
pub fn term_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9 &=?%]{0,8}").expect("Invalid regex")
}

/// Strategy for widget names accepted by the widget fixtures.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,15}").expect("Invalid regex")
}
