//! Typed access to tool call input.

use crate::error::LoopError;

/// Wrapper around a tool call's JSON input.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn get_str(&self, key: &str) -> Result<&str, LoopError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| LoopError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, LoopError> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| LoopError::InvalidArgument(format!("Missing number argument: {key}")))
    }

    /// Deserialize the whole input into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, LoopError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            LoopError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
