//! End-to-end runs through the step loop with a scripted model.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;

use common::{agent_with_tools, assert_well_formed, event_kinds, events_only, Harness};
use steploop::agent_loop::{ControllerState, RunRequest, RunStatus, Runner};
use steploop::config::LoopConfig;
use steploop::error::{LoopError, ToolError, ToolErrorKind};
use steploop::provider::ScriptedTurn;
use steploop::tools::{AgentTool, ToolParameters};
use steploop::transport::{AbortReason, RunEvent};
use steploop::types::{Role, ToolCallStatus};

#[tokio::test]
async fn calculate_then_answer_emits_events_in_order() {
    let harness = Harness::new(vec![
        ScriptedTurn::tool_call("calculate", json!({ "expression": "2+2" })),
        ScriptedTurn::text("The result is 4"),
    ]);

    let (events, result) = harness
        .runner
        .start(RunRequest::prompt("code-agent", "What is 2+2?"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_well_formed(&events);
    assert_eq!(
        events_only(&events),
        vec![
            RunEvent::ToolCallStarted {
                id: "call_1_1".into(),
                name: "calculate".into(),
                input: json!({ "expression": "2+2" }),
            },
            RunEvent::ToolCallCompleted {
                id: "call_1_1".into(),
                name: "calculate".into(),
                output: json!({ "expression": "2+2", "result": 4 }),
            },
            RunEvent::StepBoundary { step: 2 },
            RunEvent::TextDelta {
                text: "The result is 4".into(),
            },
            RunEvent::RunCompleted {
                final_text: "The result is 4".into(),
            },
        ]
    );
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.state, ControllerState::Completed);
    assert_eq!(result.steps, 2);
    assert_eq!(result.final_text, "The result is 4");

    let roles: Vec<Role> = result.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);

    let second = &harness.provider.requests()[1];
    assert_eq!(second.step, 2);
    let results = second.messages[2].tool_results();
    assert_eq!(results[0].tool_call_id, "call_1_1");
    assert_eq!(results[0].output["result"], 4);
}

#[tokio::test]
async fn provider_sees_agent_prompt_route_and_enabled_tools() {
    let harness = Harness::new(vec![ScriptedTurn::text("hello")]);

    harness
        .runner
        .start(RunRequest::prompt("research-agent", "hi"))
        .await
        .unwrap()
        .wait()
        .await;

    let request = &harness.provider.requests()[0];
    assert_eq!(request.route.qualified, "openai/gpt-4o");
    assert!(request.system_prompt.starts_with("You are a helpful research assistant"));
    let tools: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tools, vec!["web-search", "file-search"]);
}

#[tokio::test]
async fn unknown_agent_fails_before_any_model_call() {
    let harness = Harness::new(vec![ScriptedTurn::text("unused")]);

    let err = harness
        .runner
        .start(RunRequest::prompt("ghost-agent", "hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, LoopError::AgentNotFound(id) if id == "ghost-agent"));
    assert_eq!(harness.provider.call_count(), 0);
}

#[tokio::test]
async fn tool_outside_agent_set_fails_and_run_continues() {
    let harness = Harness::builder(vec![
        ScriptedTurn::tool_call("web-search", json!({ "query": "rust" })),
        ScriptedTurn::text("I cannot search from here."),
    ])
    .agent(agent_with_tools("calc-only", &["calculate"]))
    .build();

    let (events, result) = harness
        .runner
        .start(RunRequest::prompt("calc-only", "Search for rust"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_well_formed(&events);
    assert_eq!(
        event_kinds(&events),
        vec!["tool_started", "tool_failed", "step", "text", "completed"]
    );
    assert_eq!(
        events[1].event,
        RunEvent::ToolCallFailed {
            id: "call_1_1".into(),
            name: "web-search".into(),
            error: ToolError::not_available("web-search"),
        }
    );
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.tool_calls[0].status, ToolCallStatus::Failed);
    assert_eq!(harness.provider.call_count(), 2);

    let fed_back = harness.provider.requests()[1].messages[2].tool_results()[0].clone();
    assert!(fed_back.is_error);
    assert_eq!(fed_back.output["kind"], "not_available");
}

#[tokio::test]
async fn step_bound_aborts_a_model_that_never_stops_calling_tools() {
    let harness = Harness::builder(vec![ScriptedTurn::tool_call(
        "calculate",
        json!({ "expression": "3*3" }),
    )])
    .config(LoopConfig::builder().max_steps(2).build())
    .build();

    let (events, result) = harness
        .runner
        .start(RunRequest::prompt("code-agent", "loop forever"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_well_formed(&events);
    assert_eq!(harness.provider.call_count(), 2);
    assert_eq!(
        event_kinds(&events),
        vec![
            "tool_started",
            "tool_completed",
            "step",
            "tool_started",
            "tool_completed",
            "aborted",
        ]
    );
    assert_eq!(
        events.last().unwrap().event,
        RunEvent::RunAborted {
            reason: AbortReason::StepLimitReached { max_steps: 2 }
        }
    );
    assert_eq!(result.status, RunStatus::StepLimitReached);
    assert_eq!(result.tool_calls.len(), 2);
    assert_eq!(result.messages.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_batch_lets_batch_finish_then_aborts() {
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<String>();
    let gate = AgentTool::new(
        "gate",
        "waits a while",
        ToolParameters::object().string("label", "label", true).build(),
        move |args, _ctx| {
            let started_tx = started_tx.clone();
            async move {
                let label = args.get_str("label")?.to_string();
                let _ = started_tx.send(label.clone());
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, LoopError>(json!({ "label": label }))
            }
        },
    );
    let harness = Harness::builder(vec![
        ScriptedTurn::tool_call("gate", json!({ "label": "a" }))
            .with_tool_call("gate", json!({ "label": "b" })),
        ScriptedTurn::text("should never be requested"),
    ])
    .agent(agent_with_tools("gatekeeper", &["gate"]))
    .tool(gate)
    .build();

    let handle = harness
        .runner
        .start(RunRequest::prompt("gatekeeper", "go"))
        .await
        .unwrap();
    started_rx.recv().await.unwrap();
    started_rx.recv().await.unwrap();
    handle.cancel();

    let (events, result) = handle.collect().await;

    assert_well_formed(&events);
    assert_eq!(
        event_kinds(&events),
        vec!["tool_started", "tool_started", "tool_completed", "tool_completed", "aborted"]
    );
    assert_eq!(
        events.last().unwrap().event,
        RunEvent::RunAborted {
            reason: AbortReason::Cancelled
        }
    );
    assert_eq!(harness.provider.call_count(), 1);
    assert_eq!(result.status, RunStatus::Canceled);
    assert!(result
        .tool_calls
        .iter()
        .all(|call| call.status == ToolCallStatus::Completed));
}

#[tokio::test]
async fn failing_tool_does_not_affect_its_sibling() {
    let explode = AgentTool::new("explode", "always fails", ToolParameters::empty(), |_args, _ctx| async {
        Err::<serde_json::Value, _>(LoopError::tool("explode", "kaboom"))
    });
    let harness = Harness::builder(vec![
        ScriptedTurn::tool_call("explode", json!({}))
            .with_tool_call("calculate", json!({ "expression": "6*7" })),
        ScriptedTurn::text("One tool failed, the answer is 42"),
    ])
    .agent(agent_with_tools("mixed", &["explode", "calculate"]))
    .tool(explode)
    .build();

    let (events, result) = harness
        .runner
        .start(RunRequest::prompt("mixed", "go"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_well_formed(&events);
    assert_eq!(result.status, RunStatus::Completed);

    let failed = &result.tool_calls[0];
    assert_eq!(failed.status, ToolCallStatus::Failed);
    assert_eq!(failed.error.as_ref().unwrap().kind, ToolErrorKind::Execution);
    assert_eq!(failed.error.as_ref().unwrap().message, "kaboom");
    let ok = &result.tool_calls[1];
    assert_eq!(ok.status, ToolCallStatus::Completed);
    assert_eq!(ok.output.as_ref().unwrap()["result"], 42);

    let fed_back: Vec<String> = harness.provider.requests()[1]
        .messages
        .iter()
        .flat_map(|m| m.tool_results())
        .map(|r| r.tool_call_id.clone())
        .collect();
    assert_eq!(fed_back, vec![failed.id.clone(), ok.id.clone()]);
}

#[tokio::test]
async fn invalid_tool_input_is_reported_to_the_model() {
    let harness = Harness::new(vec![
        ScriptedTurn::tool_call("calculate", json!({ "expr": "2+2" })),
        ScriptedTurn::text("Let me fix that."),
    ]);

    let (_, result) = harness
        .runner
        .start(RunRequest::prompt("code-agent", "2+2"))
        .await
        .unwrap()
        .collect()
        .await;

    let error = result.tool_calls[0].error.clone().unwrap();
    assert_eq!(error.kind, ToolErrorKind::Validation);
    assert_eq!(error.message, "input: missing required field 'expression'");
}

#[tokio::test]
async fn duplicate_model_ids_are_made_unique() {
    let harness = Harness::new(vec![
        ScriptedTurn::default()
            .with_tool_call_id("dup", "calculate", json!({ "expression": "1+1" }))
            .with_tool_call_id("dup", "calculate", json!({ "expression": "2+2" })),
        ScriptedTurn::default().with_tool_call_id("dup", "calculate", json!({ "expression": "3+3" })),
        ScriptedTurn::text("done"),
    ]);

    let (events, result) = harness
        .runner
        .start(RunRequest::prompt("code-agent", "sum things"))
        .await
        .unwrap()
        .collect()
        .await;

    let ids: Vec<&str> = result.tool_calls.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], "dup");
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 3);

    let started: Vec<&str> = events.iter().filter_map(|e| match &e.event {
        RunEvent::ToolCallStarted { id, .. } => Some(id.as_str()),
        _ => None,
    }).collect();
    assert_eq!(started, ids);

    // Every result in history answers the call it was issued for.
    let issued: Vec<String> = result
        .messages
        .iter()
        .flat_map(|m| m.tool_calls())
        .map(|c| c.id.clone())
        .collect();
    let answered: Vec<String> = result
        .messages
        .iter()
        .flat_map(|m| m.tool_results())
        .map(|r| r.tool_call_id.clone())
        .collect();
    assert_eq!(issued, answered);
}

#[tokio::test]
async fn provider_failure_fails_the_run() {
    let harness = Harness::new(vec![ScriptedTurn::failure("rate limited")]);

    let (events, result) = harness
        .runner
        .start(RunRequest::prompt("code-agent", "hi"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_well_formed(&events);
    assert_eq!(
        events_only(&events),
        vec![RunEvent::RunFailed {
            reason: "Provider error: scripted: rate limited".into()
        }]
    );
    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.error.as_deref(), Some("Provider error: scripted: rate limited"));
}

#[tokio::test]
async fn provider_failure_after_a_tool_step_keeps_history() {
    let harness = Harness::new(vec![
        ScriptedTurn::tool_call("calculate", json!({ "expression": "2+2" })),
        ScriptedTurn::failure("connection reset"),
    ]);

    let (events, result) = harness
        .runner
        .start(RunRequest::prompt("code-agent", "2+2"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        event_kinds(&events),
        vec!["tool_started", "tool_completed", "step", "failed"]
    );
    assert_eq!(result.steps, 2);
    assert_eq!(result.messages.len(), 3);
}

#[tokio::test]
async fn concurrent_runs_do_not_share_state() {
    let harness = Harness::new(vec![ScriptedTurn::text("same answer")]);

    let first = harness
        .runner
        .start(RunRequest::prompt("code-agent", "one"))
        .await
        .unwrap();
    let second = harness
        .runner
        .start(RunRequest::prompt("research-agent", "two"))
        .await
        .unwrap();
    let (first_id, second_id) = (first.run_id(), second.run_id());

    let ((first_events, first_result), (second_events, second_result)) =
        tokio::join!(first.collect(), second.collect());

    assert_ne!(first_id, second_id);
    assert!(first_events.iter().all(|e| e.run_id == first_id));
    assert!(second_events.iter().all(|e| e.run_id == second_id));
    assert_eq!(first_result.messages[0].text(), "one");
    assert_eq!(second_result.messages[0].text(), "two");
    assert_eq!(first_events.len(), 2);
    assert_eq!(second_events.len(), 2);
}

#[tokio::test]
async fn text_before_tool_calls_is_kept_with_the_call() {
    let harness = Harness::new(vec![
        ScriptedTurn::text("Let me check. ")
            .with_tool_call("calculate", json!({ "expression": "10/4" })),
        ScriptedTurn::text("It is 2.5"),
    ]);

    let (events, result) = harness
        .runner
        .start(RunRequest::prompt("code-agent", "10/4?"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        event_kinds(&events),
        vec!["text", "tool_started", "tool_completed", "step", "text", "completed"]
    );
    let assistant = &result.messages[1];
    assert_eq!(assistant.text(), "Let me check. ");
    assert_eq!(assistant.tool_calls().len(), 1);
    assert_eq!(result.tool_calls[0].output.as_ref().unwrap()["result"], 2.5);
}
