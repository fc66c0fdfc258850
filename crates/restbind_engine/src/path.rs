//! Dotted-path access into nested JSON records.
//!
//! `"address.postcode"` addresses `record["address"]["postcode"]`. A path
//! without a dot is a plain key lookup.

use serde_json::{Map, Value};

const DELIMITER: char = '.';

/// Returns the value at `path`, or `None` as soon as a segment is missing.
///
/// Descending through a non-object yields `None`.
pub fn get<'a>(container: &'a Value, path: &str) -> Option<&'a Value> {
    if !path.contains(DELIMITER) {
        return container.as_object()?.get(path);
    }
    path.split(DELIMITER)
        .try_fold(container, |node, key| node.as_object()?.get(key))
}

/// Sets the value at `path`, creating intermediate objects as needed.
///
/// Any non-object found along the way (including `container` itself) is
/// replaced by an empty object. Returns `container` for chaining.
pub fn set<'a>(container: &'a mut Value, path: &str, value: Value) -> &'a mut Value {
    let mut segments = path.split(DELIMITER).peekable();
    let mut node: &mut Value = container;
    while let Some(key) = segments.next() {
        let map = ensure_object(node);
        if segments.peek().is_none() {
            map.insert(key.to_string(), value);
            break;
        }
        node = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    container
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    match node {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            ensure_object(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn plain_key_lookup() {
        let record = json!({"name": "Foo", "a.b": 1});
        assert_eq!(get(&record, "name"), Some(&json!("Foo")));
        assert_eq!(get(&record, "missing"), None);
        assert_eq!(get(&json!([1, 2]), "name"), None);
    }

    #[test]
    fn nested_lookup_stops_at_missing_segment() {
        let record = json!({"address": {"postcode": "N1", "city": null}});
        assert_eq!(get(&record, "address.postcode"), Some(&json!("N1")));
        assert_eq!(get(&record, "address.city"), Some(&Value::Null));
        assert_eq!(get(&record, "address.street.number"), None);
        assert_eq!(get(&record, "address.postcode.length"), None);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut record = json!({});
        set(&mut record, "a.b.c", json!(5));
        assert_eq!(record, json!({"a": {"b": {"c": 5}}}));

        set(&mut record, "a.d", json!("x"));
        assert_eq!(record, json!({"a": {"b": {"c": 5}, "d": "x"}}));
    }

    #[test]
    fn set_overwrites_leaf_and_scalar_intermediates() {
        let mut record = json!({"a": 1});
        set(&mut record, "a", json!(2));
        assert_eq!(record, json!({"a": 2}));

        set(&mut record, "a.b", json!(3));
        assert_eq!(record, json!({"a": {"b": 3}}));

        let mut null = Value::Null;
        set(&mut null, "x", json!(true));
        assert_eq!(null, json!({"x": true}));

        let mut list = json!([1, 2]);
        set(&mut list, "a.b", json!(4));
        assert_eq!(list, json!({"a": {"b": 4}}));
    }

    #[test]
    fn set_is_idempotent() {
        let mut once = json!({});
        set(&mut once, "a.b", json!(1));
        let mut twice = once.clone();
        set(&mut twice, "a.b", json!(1));
        assert_eq!(once, twice);
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z]{1,6}", 1..4).prop_map(|segments| segments.join("."))
    }

    proptest! {
        #[test]
        fn set_then_get_returns_value(path in path_strategy(), n in any::<i64>()) {
            let mut record = json!({"other": "kept"});
            set(&mut record, &path, json!(n));
            prop_assert_eq!(get(&record, &path), Some(&json!(n)));
        }
    }
}
