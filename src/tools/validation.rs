//! Validate tool input against the tool's JSON Schema before execution.

use serde_json::Value;

/// Validate `input` against `schema`.
///
/// Checks the schema `type`, `required` fields, `enum` membership and the
/// declared type of every known property, descending into nested object and
/// array schemas. Returns the first violation found, prefixed with the path
/// of the offending field.
pub fn validate_input(input: &Value, schema: &Value) -> Result<(), String> {
    validate_at("input", input, schema)
}

fn validate_at(path: &str, value: &Value, schema: &Value) -> Result<(), String> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !value_matches_type(value, expected) {
            return Err(format!(
                "{path}: expected type '{expected}', got {}",
                json_type_name(value)
            ));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(format!("{path}: value {value} is not one of {}", Value::Array(allowed.clone())));
        }
    }

    if let Some(obj) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !obj.contains_key(name) {
                    return Err(format!("{path}: missing required field '{name}'"));
                }
            }
        }
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (key, field) in obj {
                if let Some(field_schema) = properties.get(key) {
                    validate_at(&format!("{path}.{key}"), field, field_schema)?;
                }
            }
        }
    }

    if let (Some(items), Some(schema_items)) = (value.as_array(), schema.get("items")) {
        for (idx, item) in items.iter().enumerate() {
            validate_at(&format!("{path}[{idx}]"), item, schema_items)?;
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
