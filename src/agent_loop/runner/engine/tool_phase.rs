use super::super::super::types::{ControllerState, RunState};
use super::EngineContext;
use crate::types::{ConversationMessage, ModelTurn};

/// Record the assistant turn, run its tool calls as one batch, and append
/// every result to history in model order.
pub(super) async fn run_tool_phase(
    ctx: &EngineContext,
    state: &mut RunState,
    turn: ModelTurn,
    step: usize,
) {
    state
        .messages
        .push(ConversationMessage::assistant_with_tool_calls(
            &turn.text,
            &turn.tool_calls,
        ));
    state.transition(ControllerState::ExecutingTools);

    let records = ctx
        .dispatcher
        .dispatch_batch(&ctx.agent, &turn.tool_calls, step, &ctx.emitter, &ctx.cancel)
        .await;

    let failed = records.iter().filter(|r| r.error.is_some()).count();
    tracing::debug!(
        run_id = %ctx.run_id,
        step,
        calls = records.len(),
        failed,
        "tool batch finished"
    );

    for record in records {
        state
            .messages
            .push(ConversationMessage::tool_result(record.to_result_part()));
        state.tool_calls.push(record);
    }
}
