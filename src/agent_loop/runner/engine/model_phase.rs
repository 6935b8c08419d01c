use std::pin::Pin;

use futures::StreamExt;
use tokio::time::{self, Sleep};

use super::super::super::types::RunState;
use super::EngineContext;
use crate::provider::{ProviderRequest, ToolDefinition};
use crate::transport::RunEvent;
use crate::types::{ModelDelta, ModelTurn, ToolCallRequest};

pub(super) enum ModelPhaseOutcome {
    /// The model produced a final answer.
    Answered(ModelTurn),
    RequestedTools(ModelTurn),
    Cancelled,
    Failed(String),
}

/// Invoke the model once, forwarding text as it arrives and collecting tool calls.
pub(super) async fn run_model_phase(
    ctx: &EngineContext,
    state: &mut RunState,
    tools: &[ToolDefinition],
    step: usize,
) -> ModelPhaseOutcome {
    let request = ProviderRequest {
        route: ctx.agent.route.clone(),
        system_prompt: ctx.agent.definition.system_prompt.clone(),
        messages: state.messages.clone(),
        tools: tools.to_vec(),
        step,
    };

    let opened = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return ModelPhaseOutcome::Cancelled,
        opened = ctx.provider.stream(&request) => opened,
    };
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(err) => return ModelPhaseOutcome::Failed(err.to_string()),
    };

    let idle_timeout = ctx.config.stream_idle_timeout();
    let mut idle_sleep: Option<Pin<Box<Sleep>>> = idle_timeout.map(|d| Box::pin(time::sleep(d)));
    let mut turn = ModelTurn::default();

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                state.last_text = turn.text;
                return ModelPhaseOutcome::Cancelled;
            }
            _ = idle_elapsed(&mut idle_sleep) => {
                state.last_text = turn.text;
                return ModelPhaseOutcome::Failed("stream idle timeout".to_string());
            }
            next = stream.next() => {
                let Some(item) = next else { break };
                if let (Some(sleep), Some(timeout)) = (idle_sleep.as_mut(), idle_timeout) {
                    sleep.as_mut().reset(time::Instant::now() + timeout);
                }
                match item {
                    Ok(ModelDelta::Text { text }) => {
                        if text.is_empty() {
                            continue;
                        }
                        turn.text.push_str(&text);
                        ctx.emitter.emit(RunEvent::TextDelta { text });
                    }
                    Ok(ModelDelta::ToolCall { call }) => {
                        let id = state.claim_call_id(&call.id);
                        if id != call.id {
                            tracing::debug!(
                                run_id = %ctx.run_id,
                                proposed = %call.id,
                                assigned = %id,
                                "reassigned tool call id"
                            );
                        }
                        turn.tool_calls.push(ToolCallRequest { id, ..call });
                    }
                    Ok(ModelDelta::Done) => break,
                    Err(err) => {
                        state.last_text = turn.text;
                        return ModelPhaseOutcome::Failed(err.to_string());
                    }
                }
            }
        }
    }

    state.last_text = turn.text.clone();
    if turn.requests_tools() {
        ModelPhaseOutcome::RequestedTools(turn)
    } else {
        ModelPhaseOutcome::Answered(turn)
    }
}

async fn idle_elapsed(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
