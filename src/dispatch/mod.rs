//! Tool dispatcher: executes one step's tool calls concurrently.
//!
//! Every call goes through the same gate: availability for the agent, input
//! validation, then the handler on its own task under a timeout. Each call
//! ends in exactly one record, completed or failed, and a failure never
//! affects its siblings.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::agent::ResolvedAgent;
use crate::config::LoopConfig;
use crate::error::{LoopError, ToolError};
use crate::tools::validation::validate_input;
use crate::tools::{ToolArguments, ToolExecutionContext, ToolRegistry};
use crate::transport::{RunEvent, RunEventEmitter};
use crate::types::{ToolCallRecord, ToolCallRequest};

/// Runs tool calls against the shared registry.
///
/// `timeout` is the default handler timeout; a tool's own
/// [`Tool::timeout`](crate::tools::Tool::timeout) takes precedence.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    max_concurrency: usize,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, config: &LoopConfig) -> Self {
        Self {
            registry,
            timeout: config.tool_timeout(),
            max_concurrency: config.max_concurrent_tools.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute a batch. At most `max_concurrency` handlers run at once and a
    /// freed slot goes to the next queued call immediately. Records come back
    /// in `calls` order regardless of completion order.
    ///
    /// Once `cancel` fires, calls still waiting for a slot fail with
    /// [`ToolErrorKind::Cancelled`](crate::error::ToolErrorKind) without
    /// running; calls already in flight finish.
    pub async fn dispatch_batch(
        &self,
        agent: &ResolvedAgent,
        calls: &[ToolCallRequest],
        step: usize,
        emitter: &RunEventEmitter,
        cancel: &CancellationToken,
    ) -> Vec<ToolCallRecord> {
        let mut records: Vec<(usize, ToolCallRecord)> =
            stream::iter(calls.iter().cloned().enumerate())
                .map(|(index, call)| async move {
                    (index, self.dispatch(agent, call, step, emitter, cancel).await)
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;
        records.sort_by_key(|(index, _)| *index);
        records.into_iter().map(|(_, record)| record).collect()
    }

    /// Execute a single call, emitting its start and terminal events.
    pub async fn dispatch(
        &self,
        agent: &ResolvedAgent,
        call: ToolCallRequest,
        step: usize,
        emitter: &RunEventEmitter,
        cancel: &CancellationToken,
    ) -> ToolCallRecord {
        let mut record = ToolCallRecord::pending(&call);
        record.mark_executing();
        emitter.emit(RunEvent::ToolCallStarted {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        });

        let ctx = ToolExecutionContext {
            tool_call_id: call.id.clone(),
            agent_id: agent.definition.id.clone(),
            step,
        };
        match self.execute(agent, &call, ctx, cancel).await {
            Ok(output) => {
                tracing::debug!(tool = %call.name, call_id = %call.id, step, "tool call completed");
                record.mark_completed(output.clone());
                emitter.emit(RunEvent::ToolCallCompleted {
                    id: call.id,
                    name: call.name,
                    output,
                });
            }
            Err(error) => {
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.id,
                    step,
                    kind = %error.kind,
                    error = %error.message,
                    "tool call failed"
                );
                record.mark_failed(error.clone());
                emitter.emit(RunEvent::ToolCallFailed {
                    id: call.id,
                    name: call.name,
                    error,
                });
            }
        }
        record
    }

    async fn execute(
        &self,
        agent: &ResolvedAgent,
        call: &ToolCallRequest,
        ctx: ToolExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolError> {
        if cancel.is_cancelled() {
            return Err(ToolError::cancelled());
        }
        let tool = agent
            .is_tool_enabled(&call.name)
            .then(|| self.registry.lookup(&call.name))
            .flatten()
            .ok_or_else(|| ToolError::not_available(&call.name))?;

        validate_input(&call.input, &tool.parameters().schema).map_err(ToolError::validation)?;

        let timeout = tool.timeout().unwrap_or(self.timeout);
        let args = ToolArguments::new(call.input.clone());
        let handle = tokio::spawn(async move { tool.execute(&args, &ctx).await });
        let abort = handle.abort_handle();

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(err))) => Err(ToolError::execution(handler_message(err))),
            Ok(Err(join_err)) if join_err.is_panic() => {
                Err(ToolError::execution("tool handler panicked"))
            }
            Ok(Err(_)) => Err(ToolError::execution("tool handler was cancelled")),
            Err(_) => {
                abort.abort();
                Err(ToolError::timeout(timeout.as_millis() as u64))
            }
        }
    }
}

fn handler_message(err: LoopError) -> String {
    match err {
        LoopError::ToolExecution { message, .. } => message,
        other => other.to_string(),
    }
}
