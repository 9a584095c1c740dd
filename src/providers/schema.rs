//! Strict JSON schemas for structured outputs.

use serde_json::Value;

/// Keywords rejected by strict structured outputs.
const UNSUPPORTED_PROPERTIES: &[&str] = &[
    "$schema",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "minProperties",
    "maxProperties",
];

/// Makes a schema strict: every object closed with `additionalProperties:
/// false`, every property required, unsupported constraints removed.
///
/// An existing `required` list is always replaced with every property key.
/// Strict structured outputs reject a schema whose `required` omits any
/// property, and schemars leaves out fields that carry a default.
pub fn transform_for_strict(schema: Value) -> Value {
    transform_object(schema)
}

fn transform_object(mut value: Value) -> Value {
    if let Value::Object(ref mut map) = value {
        for prop in UNSUPPORTED_PROPERTIES {
            map.remove(*prop);
        }

        if map.get("type") == Some(&Value::String("object".to_string())) {
            map.insert("additionalProperties".to_string(), Value::Bool(false));

            if let Some(Value::Object(props)) = map.get("properties") {
                let keys: Vec<Value> = props.keys().map(|k| Value::String(k.clone())).collect();
                if !keys.is_empty() {
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }
        }

        for (_, v) in map.iter_mut() {
            *v = transform_object(std::mem::take(v));
        }
    }

    if let Value::Array(ref mut arr) = value {
        for v in arr.iter_mut() {
            *v = transform_object(std::mem::take(v));
        }
    }

    value
}

/// Generate a strict schema from a Rust type using schemars.
pub fn strict_schema<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let value = serde_json::to_value(schema).unwrap_or_default();
    transform_for_strict(value)
}
