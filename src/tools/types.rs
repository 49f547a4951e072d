//! Parameter schemas advertised for tools.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema describing a tool's argument object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentToolParameters {
    pub schema: Value,
}

impl AgentToolParameters {
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// An object schema with no properties.
    pub fn empty() -> Self {
        Self::object().build()
    }

    /// Start building an object schema.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder::default()
    }
}

/// Builder for object parameter schemas.
#[derive(Debug, Default)]
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn string(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description }),
            required,
        )
    }

    pub fn integer(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "integer", "description": description }),
            required,
        )
    }

    pub fn number(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "number", "description": description }),
            required,
        )
    }

    pub fn boolean(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "boolean", "description": description }),
            required,
        )
    }

    /// Array of strings.
    pub fn string_array(self, name: impl Into<String>, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "array", "items": { "type": "string" }, "description": description }),
            required,
        )
    }

    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: &str,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description, "enum": values }),
            required,
        )
    }

    pub fn build(self) -> AgentToolParameters {
        AgentToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_collects_required_fields_once() {
        let params = AgentToolParameters::object()
            .string("path", "File path", true)
            .string("path", "File path again", true)
            .boolean("recursive", "Recurse", false)
            .build();

        assert_eq!(params.schema["required"], json!(["path"]));
        assert_eq!(params.schema["properties"]["recursive"]["type"], "boolean");
    }

    #[test]
    fn empty_schema_is_an_object() {
        assert_eq!(
            AgentToolParameters::empty().schema,
            json!({ "type": "object", "properties": {}, "required": [] })
        );
    }
}
