//! Run event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ToolError;

/// Why a run stopped before the model produced a final answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// The step bound was hit while the model still requested tools.
    StepLimitReached { max_steps: usize },
    /// The caller cancelled the run.
    Cancelled,
    /// The model call failed.
    ProviderError { message: String },
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StepLimitReached { max_steps } => {
                write!(f, "step limit reached (max_steps={max_steps})")
            }
            Self::Cancelled => f.write_str("cancelled"),
            Self::ProviderError { message } => write!(f, "provider error: {message}"),
        }
    }
}

/// Payload of a single run event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    TextDelta {
        text: String,
    },
    ToolCallStarted {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolCallCompleted {
        id: String,
        name: String,
        output: serde_json::Value,
    },
    ToolCallFailed {
        id: String,
        name: String,
        error: ToolError,
    },
    /// A new step begins; emitted between steps, never before the first.
    StepBoundary {
        step: usize,
    },
    RunCompleted {
        final_text: String,
    },
    RunFailed {
        reason: String,
    },
    RunAborted {
        reason: AbortReason,
    },
}

impl RunEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RunCompleted { .. } | Self::RunFailed { .. } | Self::RunAborted { .. }
        )
    }
}

/// Envelope carrying ordering metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEnvelope {
    pub run_id: Uuid,
    /// Starts at 1 and increases by one per event.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: RunEvent,
}

impl RunEnvelope {
    /// Single-line JSON encoding for line-oriented transports.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
