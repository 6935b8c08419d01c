//! Structured tool-call failures.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Why a single tool call failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolErrorKind {
    /// The tool is unknown or not enabled for the agent.
    NotAvailable,
    /// Input did not match the tool's schema.
    Validation,
    /// The handler returned an error or panicked.
    Execution,
    /// The handler exceeded its timeout.
    Timeout,
    /// The run was cancelled while the call was still queued; its handler never ran.
    Cancelled,
}

/// Failure payload attached to a failed tool call. Never the agent's answer text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_available(tool_name: &str) -> Self {
        Self::new(
            ToolErrorKind::NotAvailable,
            format!("Tool '{tool_name}' is not available for this agent"),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, message)
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            format!("tool timed out after {timeout_ms}ms"),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(
            ToolErrorKind::Cancelled,
            "run cancelled before the tool call started",
        )
    }

    /// JSON form fed back to the model as the tool result.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        })
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
