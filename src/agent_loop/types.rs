//! Core run types for the step loop.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transport::AbortReason;
use crate::types::{ConversationMessage, ToolCallRecord};

/// Unique run identifier.
pub type RunId = Uuid;

/// Controller state machine.
///
/// `Init -> AwaitingModel -> (ExecutingTools -> AwaitingModel)* -> Completed | Aborted`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ControllerState {
    Init,
    AwaitingModel,
    ExecutingTools,
    Completed,
    Aborted { reason: AbortReason },
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted { .. })
    }

    pub fn can_transition_to(&self, next: &ControllerState) -> bool {
        use ControllerState::*;
        match (self, next) {
            (_, Init) => false,
            (Completed | Aborted { .. }, _) => false,
            (_, Aborted { .. }) => true,
            (Init, AwaitingModel) => true,
            (AwaitingModel, ExecutingTools | Completed) => true,
            (ExecutingTools, AwaitingModel) => true,
            _ => false,
        }
    }
}

/// Run lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Completed,
    StepLimitReached,
    Canceled,
    Failed,
}

impl RunStatus {
    fn from_state(state: &ControllerState) -> Self {
        match state {
            ControllerState::Completed => Self::Completed,
            ControllerState::Aborted {
                reason: AbortReason::StepLimitReached { .. },
            } => Self::StepLimitReached,
            ControllerState::Aborted {
                reason: AbortReason::Cancelled,
            } => Self::Canceled,
            _ => Self::Failed,
        }
    }
}

/// Mutable state owned by one run's controller.
#[derive(Debug)]
pub struct RunState {
    /// Steps begun so far; the current step index once a step is under way.
    pub step: usize,
    pub max_steps: usize,
    pub messages: Vec<ConversationMessage>,
    pub controller: ControllerState,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Assistant text produced by the most recent model turn.
    pub last_text: String,
    issued_call_ids: HashSet<String>,
}

impl RunState {
    pub fn new(history: Vec<ConversationMessage>, max_steps: usize) -> Self {
        let issued_call_ids = history
            .iter()
            .flat_map(|message| message.tool_calls())
            .map(|call| call.id.clone())
            .collect();
        Self {
            step: 0,
            max_steps,
            messages: history,
            controller: ControllerState::Init,
            tool_calls: Vec::new(),
            last_text: String::new(),
            issued_call_ids,
        }
    }

    pub fn step_budget_left(&self) -> bool {
        self.step < self.max_steps
    }

    /// Move to `next`; an illegal transition is logged and ignored.
    pub fn transition(&mut self, next: ControllerState) {
        if self.controller.can_transition_to(&next) {
            self.controller = next;
        } else {
            tracing::warn!(from = ?self.controller, to = ?next, "ignoring illegal controller transition");
        }
    }

    /// Begin the next step and return its 1-based index.
    pub fn begin_step(&mut self) -> usize {
        self.step += 1;
        self.transition(ControllerState::AwaitingModel);
        self.step
    }

    /// Claim an id for a model-issued tool call. Empty or already-used ids
    /// are replaced with a fresh one.
    pub fn claim_call_id(&mut self, proposed: &str) -> String {
        let id = if proposed.is_empty() || self.issued_call_ids.contains(proposed) {
            loop {
                let candidate = format!("call_{}", Uuid::new_v4().simple());
                if !self.issued_call_ids.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            proposed.to_string()
        };
        self.issued_call_ids.insert(id.clone());
        id
    }

    pub fn into_result(self, run_id: RunId) -> RunResult {
        let error = match &self.controller {
            ControllerState::Aborted {
                reason: AbortReason::ProviderError { message },
            } => Some(message.clone()),
            _ => None,
        };
        RunResult {
            run_id,
            status: RunStatus::from_state(&self.controller),
            state: self.controller,
            final_text: self.last_text,
            steps: self.step,
            messages: self.messages,
            tool_calls: self.tool_calls,
            error,
            finished_at: Utc::now(),
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub status: RunStatus,
    pub state: ControllerState,
    /// Final answer on completion, otherwise whatever text the last step produced.
    pub final_text: String,
    /// Model invocations made.
    pub steps: usize,
    pub messages: Vec<ConversationMessage>,
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Result for a run whose task ended without reporting.
    pub fn lost(run_id: RunId) -> Self {
        Self {
            run_id,
            status: RunStatus::Failed,
            state: ControllerState::Aborted {
                reason: AbortReason::ProviderError {
                    message: "run task ended without a result".to_string(),
                },
            },
            final_text: String::new(),
            steps: 0,
            messages: Vec::new(),
            tool_calls: Vec::new(),
            error: Some("run task ended without a result".to_string()),
            finished_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCallRequest;

    #[test]
    fn state_machine_rejects_backward_and_post_terminal_moves() {
        use ControllerState::*;
        assert!(Init.can_transition_to(&AwaitingModel));
        assert!(!Init.can_transition_to(&ExecutingTools));
        assert!(AwaitingModel.can_transition_to(&ExecutingTools));
        assert!(ExecutingTools.can_transition_to(&AwaitingModel));
        assert!(!ExecutingTools.can_transition_to(&Completed));
        assert!(ExecutingTools.can_transition_to(&Aborted {
            reason: AbortReason::Cancelled
        }));
        assert!(!Completed.can_transition_to(&AwaitingModel));
        assert!(!Aborted {
            reason: AbortReason::Cancelled
        }
        .can_transition_to(&Completed));
    }

    #[test]
    fn claimed_ids_are_unique_within_a_run() {
        let earlier = ToolCallRequest::new("call_1", "calculate", serde_json::json!({}));
        let history = vec![ConversationMessage::assistant_with_tool_calls("", &[earlier])];
        let mut state = RunState::new(history, 5);

        let reused = state.claim_call_id("call_1");
        let fresh = state.claim_call_id("call_2");
        let blank = state.claim_call_id("");
        let again = state.claim_call_id("call_2");

        assert_ne!(reused, "call_1");
        assert_eq!(fresh, "call_2");
        assert!(blank.starts_with("call_"));
        assert_ne!(again, "call_2");
        let unique: HashSet<&String> = [&reused, &fresh, &blank, &again].into_iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn result_status_follows_terminal_state() {
        let mut state = RunState::new(Vec::new(), 1);
        state.begin_step();
        state.transition(ControllerState::Aborted {
            reason: AbortReason::ProviderError {
                message: "boom".into(),
            },
        });
        let result = state.into_result(Uuid::nil());
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.steps, 1);
    }
}
