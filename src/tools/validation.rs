//! Argument validation against a tool's parameter schema.
//!
//! Covers the subset of JSON Schema the parameter builder emits: object
//! type, required keys, per-property primitive types, string enums and array
//! item types. Unknown keywords are ignored.

use serde_json::Value;
use thiserror::Error;

/// First schema rule an argument object broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("expected object arguments, got {0}")]
    NotAnObject(&'static str),
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("field '{field}' expected type '{expected}', got {actual}")]
    WrongType {
        field: String,
        expected: String,
        actual: &'static str,
    },
    #[error("field '{field}' must be one of {allowed}")]
    NotInEnum { field: String, allowed: String },
}

/// Check `args` against `schema`.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), SchemaViolation> {
    let expects_object = schema.get("type").and_then(Value::as_str) == Some("object");
    let Some(object) = args.as_object() else {
        return if expects_object {
            Err(SchemaViolation::NotAnObject(json_type_name(args)))
        } else {
            Ok(())
        };
    };

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for name in required {
        if !object.contains_key(name) {
            return Err(SchemaViolation::MissingField(name.to_string()));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in object {
        if let Some(property) = properties.get(key) {
            check_property(key, value, property)?;
        }
    }
    Ok(())
}

fn check_property(key: &str, value: &Value, property: &Value) -> Result<(), SchemaViolation> {
    if let Some(expected) = property.get("type").and_then(Value::as_str) {
        if !matches_type(value, expected) {
            return Err(SchemaViolation::WrongType {
                field: key.to_string(),
                expected: expected.to_string(),
                actual: json_type_name(value),
            });
        }
    }

    if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(SchemaViolation::NotInEnum {
                field: key.to_string(),
                allowed: Value::Array(allowed.clone()).to_string(),
            });
        }
    }

    if let (Some(items), Some(item_type)) = (
        value.as_array(),
        property
            .get("items")
            .and_then(|items| items.get("type"))
            .and_then(Value::as_str),
    ) {
        if let Some((index, bad)) = items
            .iter()
            .enumerate()
            .find(|(_, item)| !matches_type(item, item_type))
        {
            return Err(SchemaViolation::WrongType {
                field: format!("{key}[{index}]"),
                expected: item_type.to_string(),
                actual: json_type_name(bad),
            });
        }
    }
    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AgentToolParameters;
    use serde_json::json;

    fn read_file_schema() -> Value {
        AgentToolParameters::object()
            .string("path", "File path", true)
            .integer("limit", "Max lines", false)
            .string_enum("mode", "Read mode", &["text", "bytes"], false)
            .string_array("tags", "Tags", false)
            .build()
            .schema
    }

    #[test]
    fn accepts_minimal_valid_args() {
        assert_eq!(
            validate_arguments(&json!({ "path": "a.txt" }), &read_file_schema()),
            Ok(())
        );
    }

    #[test]
    fn rejects_non_object_args() {
        assert_eq!(
            validate_arguments(&json!("a.txt"), &read_file_schema()),
            Err(SchemaViolation::NotAnObject("string"))
        );
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate_arguments(&json!({ "limit": 3 }), &read_file_schema()).unwrap_err();
        assert_eq!(err.to_string(), "missing required field 'path'");
    }

    #[test]
    fn rejects_float_for_integer() {
        let err = validate_arguments(&json!({ "path": "a", "limit": 1.5 }), &read_file_schema())
            .unwrap_err();
        assert!(err.to_string().contains("expected type 'integer'"));
    }

    #[test]
    fn rejects_value_outside_enum() {
        let err = validate_arguments(&json!({ "path": "a", "mode": "hex" }), &read_file_schema())
            .unwrap_err();
        assert!(matches!(err, SchemaViolation::NotInEnum { .. }));
    }

    #[test]
    fn reports_bad_array_item_index() {
        let err = validate_arguments(
            &json!({ "path": "a", "tags": ["x", 2] }),
            &read_file_schema(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'tags[1]' expected type 'string', got number"
        );
    }

    #[test]
    fn extra_fields_and_untyped_schemas_pass() {
        assert!(
            validate_arguments(&json!({ "path": "a", "extra": true }), &read_file_schema()).is_ok()
        );
        assert!(validate_arguments(&Value::Null, &json!({})).is_ok());
    }
}
