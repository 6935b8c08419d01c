//! Tool call lifecycle records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::{ToolCallRequest, ToolResultPart};
use crate::error::ToolError;

/// Lifecycle status of a tool call.
///
/// Ordered so that a transition is valid only when it moves forward.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl ToolCallStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_transition_to(self, next: ToolCallStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Executing),
            Self::Executing => next.is_terminal(),
            Self::Completed | Self::Failed => false,
        }
    }
}

/// Full record of one tool call within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    pub id: String,
    pub tool_name: String,
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolCallRecord {
    pub fn pending(request: &ToolCallRequest) -> Self {
        Self {
            id: request.id.clone(),
            tool_name: request.name.clone(),
            input: request.input.clone(),
            output: None,
            status: ToolCallStatus::Pending,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn mark_executing(&mut self) {
        if self.status.can_transition_to(ToolCallStatus::Executing) {
            self.status = ToolCallStatus::Executing;
            self.started_at = Some(Utc::now());
        }
    }

    pub fn mark_completed(&mut self, output: serde_json::Value) {
        if self.status.can_transition_to(ToolCallStatus::Completed) {
            self.status = ToolCallStatus::Completed;
            self.output = Some(output);
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn mark_failed(&mut self, error: ToolError) {
        if self.status.can_transition_to(ToolCallStatus::Failed) {
            self.status = ToolCallStatus::Failed;
            self.error = Some(error);
            self.completed_at = Some(Utc::now());
        }
    }

    /// History entry handed back to the model.
    pub fn to_result_part(&self) -> ToolResultPart {
        let (output, is_error) = match (&self.error, &self.output) {
            (Some(error), _) => (error.to_value(), true),
            (None, Some(output)) => (output.clone(), false),
            (None, None) => (serde_json::Value::Null, false),
        };
        ToolResultPart {
            tool_call_id: self.id.clone(),
            tool_name: self.tool_name.clone(),
            output,
            is_error,
        }
    }
}
