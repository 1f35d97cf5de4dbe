// coerce.rs
//
// Parameter coercion (spec §4.1). Go's implementation uses `reflect` to
// enumerate a struct's field names at call time; Rust has no runtime
// reflection, so each param type instead declares its field names once via
// `ParamSpec` (see the `param_spec!` macro). `coerce` then reproduces the
// exact object/array matching rules against that field list before handing
// the normalized value to `serde_json`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub trait ParamSpec: DeserializeOwned {
    /// Field names in struct declaration order, exactly as they are named
    /// for serde (no renames assumed).
    const FIELDS: &'static [&'static str];
}

/// Coerce an arbitrary JSON value into `T`, following the object/array
/// matching rules of spec §4.1.
pub fn coerce<T: ParamSpec>(data: &Value) -> Result<T, String> {
    serde_json::from_value(normalize::<T>(data)?).map_err(|e| e.to_string())
}

/// The object/array matching step alone (spec §4.1), stopping short of
/// the final `serde_json` decode into `T`. This is what runs at step 5 of
/// the dispatch pipeline (spec §4.2), before the before-hook ever sees the
/// params: the hook gets the normalized, field-complete object, and the
/// later decode into `T` can no longer fail on shape.
pub fn normalize<T: ParamSpec>(data: &Value) -> Result<Value, String> {
    let fields = T::FIELDS;
    let normalized = match data {
        Value::Object(map) => coerce_object(fields, map)?,
        Value::Array(arr) => coerce_array(fields, arr)?,
        _ => return Err("json: params must be an object or array".to_string()),
    };
    Ok(Value::Object(normalized))
}

fn coerce_object(
    fields: &[&'static str],
    map: &Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    if map.len() != fields.len() {
        return Err("json: The number of parameters does not match".to_string());
    }
    let mut normalized = Map::new();
    for &field in fields {
        let lower = field.to_ascii_lowercase();
        let found = map.iter().find(|(k, _)| k.to_ascii_lowercase() == lower);
        match found {
            Some((_, v)) => {
                normalized.insert(field.to_string(), v.clone());
            }
            None => return Err(format!("json: can not find field \"{}\"", lower)),
        }
    }
    Ok(normalized)
}

fn coerce_array(fields: &[&'static str], arr: &[Value]) -> Result<Map<String, Value>, String> {
    if arr.len() != fields.len() {
        return Err("json: The number of parameters does not match".to_string());
    }
    let mut normalized = Map::new();
    for (field, value) in fields.iter().zip(arr.iter()) {
        normalized.insert((*field).to_string(), value.clone());
    }
    Ok(normalized)
}

/// Declares a `ParamSpec` impl for a params struct, listing its fields in
/// declaration order. Usage: `param_spec!(AddParams { a, b });`
#[macro_export]
macro_rules! param_spec {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl $crate::wire::coerce::ParamSpec for $name {
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];
        }
    };
}

#[cfg(test)]
mod coerce_tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct AddParams {
        a: i64,
        b: i64,
    }
    crate::param_spec!(AddParams { a, b });

    #[test]
    fn object_matches_case_insensitively() {
        let data = serde_json::json!({"A": 1, "B": 2});
        let parsed: AddParams = coerce(&data).unwrap();
        assert_eq!(parsed, AddParams { a: 1, b: 2 });
    }

    #[test]
    fn array_assigns_positionally() {
        let data = serde_json::json!([1, 2]);
        let parsed: AddParams = coerce(&data).unwrap();
        assert_eq!(parsed, AddParams { a: 1, b: 2 });
    }

    #[test]
    fn wrong_field_count_is_invalid() {
        let data = serde_json::json!({"a": 1});
        let result: Result<AddParams, String> = coerce(&data);
        assert!(result.is_err());
    }

    #[test]
    fn missing_field_is_invalid() {
        let data = serde_json::json!({"a": 1, "c": 2});
        let result: Result<AddParams, String> = coerce(&data);
        assert!(result.is_err());
    }

    #[test]
    fn scalar_params_are_invalid() {
        let data = serde_json::json!(42);
        let result: Result<AddParams, String> = coerce(&data);
        assert!(result.is_err());
    }
}
