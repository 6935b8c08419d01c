//! Step loop controller.

mod model_phase;
mod tool_phase;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use self::model_phase::{run_model_phase, ModelPhaseOutcome};
use self::tool_phase::run_tool_phase;
use super::super::types::{ControllerState, RunId, RunState};
use crate::agent::ResolvedAgent;
use crate::config::LoopConfig;
use crate::dispatch::ToolDispatcher;
use crate::provider::ModelProvider;
use crate::transport::{AbortReason, RunEvent, RunEventEmitter};
use crate::types::ConversationMessage;

/// Everything a run needs besides its own mutable state.
pub(super) struct EngineContext {
    pub(super) run_id: RunId,
    pub(super) agent: ResolvedAgent,
    pub(super) provider: Arc<dyn ModelProvider>,
    pub(super) dispatcher: ToolDispatcher,
    pub(super) config: LoopConfig,
    pub(super) emitter: RunEventEmitter,
    pub(super) cancel: CancellationToken,
}

/// Drive the run to a terminal state. Exactly one terminal event is emitted.
pub(super) async fn drive(ctx: &EngineContext, mut state: RunState) -> RunState {
    let tools = ctx
        .dispatcher
        .registry()
        .definitions_for(&ctx.agent.enabled_tools);

    loop {
        if ctx.cancel.is_cancelled() {
            return abort(ctx, state, AbortReason::Cancelled);
        }
        if !state.step_budget_left() {
            let max_steps = state.max_steps;
            return abort(ctx, state, AbortReason::StepLimitReached { max_steps });
        }
        if state.step > 0 {
            ctx.emitter.emit(RunEvent::StepBoundary {
                step: state.step + 1,
            });
        }
        let step = state.begin_step();
        tracing::debug!(run_id = %ctx.run_id, step, "step started");

        match run_model_phase(ctx, &mut state, &tools, step).await {
            ModelPhaseOutcome::Answered(turn) => {
                state
                    .messages
                    .push(ConversationMessage::assistant(turn.text.clone()));
                state.transition(ControllerState::Completed);
                ctx.emitter.emit(RunEvent::RunCompleted {
                    final_text: turn.text,
                });
                return state;
            }
            ModelPhaseOutcome::RequestedTools(turn) => {
                if ctx.cancel.is_cancelled() {
                    return abort(ctx, state, AbortReason::Cancelled);
                }
                run_tool_phase(ctx, &mut state, turn, step).await;
            }
            ModelPhaseOutcome::Cancelled => {
                return abort(ctx, state, AbortReason::Cancelled);
            }
            ModelPhaseOutcome::Failed(message) => {
                tracing::warn!(run_id = %ctx.run_id, step, error = %message, "model call failed");
                state.transition(ControllerState::Aborted {
                    reason: AbortReason::ProviderError {
                        message: message.clone(),
                    },
                });
                ctx.emitter.emit(RunEvent::RunFailed { reason: message });
                return state;
            }
        }
    }
}

fn abort(ctx: &EngineContext, mut state: RunState, reason: AbortReason) -> RunState {
    tracing::debug!(run_id = %ctx.run_id, step = state.step, %reason, "run aborted");
    state.transition(ControllerState::Aborted {
        reason: reason.clone(),
    });
    ctx.emitter.emit(RunEvent::RunAborted { reason });
    state
}
