//! Consumer-side folds over a run's event stream.
//!
//! [`ToolExecutionTracker`] keeps one record per tool call id and
//! [`Transcript`] keeps per-step text plus the terminal outcome. Both accept
//! envelopes in any order and never move a record backwards.

use std::collections::HashMap;

use serde::Serialize;

use crate::transport::{AbortReason, RunEnvelope, RunEvent};
use crate::types::{ToolCallRecord, ToolCallRequest, ToolCallStatus};

/// Count of tracked calls per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerSummary {
    pub pending: usize,
    pub executing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TrackerSummary {
    pub fn total(&self) -> usize {
        self.pending + self.executing + self.completed + self.failed
    }
}

/// Tool call status per id, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionTracker {
    order: Vec<String>,
    records: HashMap<String, ToolCallRecord>,
}

impl ToolExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one envelope in. Returns `true` when a record changed.
    pub fn apply(&mut self, envelope: &RunEnvelope) -> bool {
        match &envelope.event {
            RunEvent::ToolCallStarted { id, name, input } => {
                let record = self.entry(id, name, Some(input));
                let before = record.status;
                record.mark_executing();
                record.status != before
            }
            RunEvent::ToolCallCompleted { id, name, output } => {
                let record = self.entry(id, name, None);
                let before = record.status;
                record.mark_executing();
                record.mark_completed(output.clone());
                record.status != before
            }
            RunEvent::ToolCallFailed { id, name, error } => {
                let record = self.entry(id, name, None);
                let before = record.status;
                record.mark_executing();
                record.mark_failed(error.clone());
                record.status != before
            }
            _ => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ToolCallRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn summary(&self) -> TrackerSummary {
        self.records()
            .fold(TrackerSummary::default(), |mut summary, record| {
                match record.status {
                    ToolCallStatus::Pending => summary.pending += 1,
                    ToolCallStatus::Executing => summary.executing += 1,
                    ToolCallStatus::Completed => summary.completed += 1,
                    ToolCallStatus::Failed => summary.failed += 1,
                }
                summary
            })
    }

    /// Whether any call has started and not yet finished.
    pub fn has_active(&self) -> bool {
        self.records().any(|record| !record.status.is_terminal())
    }

    fn entry(
        &mut self,
        id: &str,
        name: &str,
        input: Option<&serde_json::Value>,
    ) -> &mut ToolCallRecord {
        if !self.records.contains_key(id) {
            self.order.push(id.to_string());
        }
        let record = self.records.entry(id.to_string()).or_insert_with(|| {
            ToolCallRecord::pending(&ToolCallRequest::new(id, name, serde_json::Value::Null))
        });
        if let Some(input) = input {
            if record.input.is_null() {
                record.input = input.clone();
            }
        }
        record
    }
}

/// How a run ended, as seen by the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { final_text: String },
    Failed { reason: String },
    Aborted { reason: AbortReason },
}

/// Assistant text grouped by step, plus the terminal outcome.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    steps: Vec<String>,
    outcome: Option<RunOutcome>,
    last_seq: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one envelope in. Envelopes at or below the last seen sequence are ignored.
    pub fn apply(&mut self, envelope: &RunEnvelope) {
        if envelope.seq <= self.last_seq {
            return;
        }
        self.last_seq = envelope.seq;
        match &envelope.event {
            RunEvent::TextDelta { text } => {
                if self.steps.is_empty() {
                    self.steps.push(String::new());
                }
                if let Some(current) = self.steps.last_mut() {
                    current.push_str(text);
                }
            }
            RunEvent::StepBoundary { step } => {
                while self.steps.len() < *step {
                    self.steps.push(String::new());
                }
            }
            RunEvent::RunCompleted { final_text } => {
                self.outcome = Some(RunOutcome::Completed {
                    final_text: final_text.clone(),
                });
            }
            RunEvent::RunFailed { reason } => {
                self.outcome = Some(RunOutcome::Failed {
                    reason: reason.clone(),
                });
            }
            RunEvent::RunAborted { reason } => {
                self.outcome = Some(RunOutcome::Aborted {
                    reason: reason.clone(),
                });
            }
            _ => {}
        }
    }

    /// Text streamed during each step, 1-based step `n` at index `n - 1`.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len().max(usize::from(self.outcome.is_some()))
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Final answer on completion, otherwise the text of the last step.
    pub fn final_text(&self) -> &str {
        match &self.outcome {
            Some(RunOutcome::Completed { final_text }) => final_text,
            _ => self.steps.last().map(String::as_str).unwrap_or(""),
        }
    }
}
