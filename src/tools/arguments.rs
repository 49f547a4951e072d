//! Typed access to tool call arguments.

use serde_json::{Map, Value};

use crate::error::ParleyError;

/// Arguments of one tool call as the model sent them.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    /// Wrap a raw value. String-encoded JSON objects are decoded; anything
    /// unparseable is kept as-is and fails validation later.
    pub fn new(value: Value) -> Self {
        let value = match value {
            Value::String(raw) => match raw.trim() {
                "" => Value::Object(Map::new()),
                trimmed => serde_json::from_str(trimmed).unwrap_or(Value::String(raw)),
            },
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self { value }
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// The arguments as an object map; non-object arguments yield an empty map.
    pub fn to_map(&self) -> Map<String, Value> {
        self.value.as_object().cloned().unwrap_or_default()
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ParleyError> {
        self.value
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| missing("string", key))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ParleyError> {
        self.value
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing("integer", key))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ParleyError> {
        self.value
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing("boolean", key))
    }

    /// Deserialize the whole argument object into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, ParleyError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            ParleyError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

fn missing(kind: &str, key: &str) -> ParleyError {
    ParleyError::InvalidArgument(format!("Missing {kind} argument: {key}"))
}
