//! Incremental model output.

use serde::{Deserialize, Serialize};

use super::message::ToolCallRequest;

/// One item of a streamed model response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelDelta {
    /// Incremental assistant text.
    Text { text: String },
    /// A complete tool call request.
    ToolCall { call: ToolCallRequest },
    /// The model finished this turn.
    Done,
}

impl ModelDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_call(call: ToolCallRequest) -> Self {
        Self::ToolCall { call }
    }
}

/// Accumulated result of one model invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTurn {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelTurn {
    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
