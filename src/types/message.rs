//! Conversation message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationMessage {
    fn with_parts(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            role,
            content,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_parts(Role::System, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_parts(Role::User, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_parts(Role::Assistant, vec![ContentPart::Text { text: text.into() }])
    }

    /// Assistant turn that requested tools, optionally preceded by text.
    pub fn assistant_with_tool_calls(text: &str, calls: &[ToolCallRequest]) -> Self {
        let mut content = Vec::with_capacity(calls.len() + 1);
        if !text.is_empty() {
            content.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        content.extend(calls.iter().cloned().map(ContentPart::ToolCall));
        Self::with_parts(Role::Assistant, content)
    }

    /// Create a tool result message.
    pub fn tool_result(result: ToolResultPart) -> Self {
        Self::with_parts(Role::Tool, vec![ContentPart::ToolResult(result)])
    }

    /// Concatenate all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool calls referenced by this message.
    pub fn tool_calls(&self) -> Vec<&ToolCallRequest> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// Tool results carried by this message.
    pub fn tool_results(&self) -> Vec<&ToolResultPart> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult(result) => Some(result),
                _ => None,
            })
            .collect()
    }
}

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ToolCall(ToolCallRequest),
    ToolResult(ToolResultPart),
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// A tool result appended to history for the next model turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub output: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}
