//! Parameter canonicalization for cache-key derivation (§4.5).
//!
//! Object keys are sorted recursively and numeric forms are normalized so
//! that two JSON-equivalent parameter sets produce the same cache key
//! regardless of field order or float/int spelling.

use serde_json::{Map, Number, Value};

pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) => canonicalize_number(n),
        other => other.clone(),
    }
}

fn canonicalize_number(n: &Number) -> Value {
    if let Some(f) = n.as_f64() {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            return Value::Number(Number::from(f as i64));
        }
    }
    Value::Number(n.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_nested_object_keys() {
        let value = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let canon = canonicalize(&value);
        assert_eq!(
            serde_json::to_string(&canon).unwrap(),
            r#"{"a":{"c":3,"d":2},"b":1}"#
        );
    }

    #[test]
    fn normalizes_integer_valued_floats() {
        let value = json!({"block": 5.0});
        let canon = canonicalize(&value);
        assert_eq!(serde_json::to_string(&canon).unwrap(), r#"{"block":5}"#);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let value = json!({"z": 1, "a": [3.0, {"y": 2, "x": 1}]});
        let once = canonicalize(&value);
        let twice = canonicalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn leaves_non_integer_floats_untouched() {
        let value = json!({"price": 1.5});
        let canon = canonicalize(&value);
        assert_eq!(serde_json::to_string(&canon).unwrap(), r#"{"price":1.5}"#);
    }
}
