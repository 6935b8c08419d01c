//! Tool parameter schemas.

use serde::{Deserialize, Serialize};

/// JSON Schema describing a tool's input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameters {
    pub schema: serde_json::Value,
}

impl ToolParameters {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: serde_json::Value) -> Self {
        Self { schema }
    }

    /// An object schema with no properties.
    pub fn empty() -> Self {
        Self::object().build()
    }

    /// Start building an object schema.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for object-shaped parameter schemas.
pub struct ParameterBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(
        mut self,
        name: impl Into<String>,
        schema: serde_json::Value,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), schema);
        if required {
            self.required.push(name);
        }
        self
    }

    /// Add a string property.
    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = serde_json::json!({ "type": "string", "description": description.into() });
        self.property(name, schema, required)
    }

    /// Add a number property.
    pub fn number(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = serde_json::json!({ "type": "number", "description": description.into() });
        self.property(name, schema, required)
    }

    /// Add an integer property.
    pub fn integer(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = serde_json::json!({ "type": "integer", "description": description.into() });
        self.property(name, schema, required)
    }

    /// Add a string property restricted to `values`.
    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({
            "type": "string",
            "description": description.into(),
            "enum": values,
        });
        self.property(name, schema, required)
    }

    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
