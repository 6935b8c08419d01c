//! Command handlers.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;

use super::RunArgs;
use crate::agent::{AgentResolver, AgentStore, InMemoryAgentStore};
use crate::agent_loop::{LoopRunner, RunRequest, RunStatus, Runner};
use crate::config::LoopConfig;
use crate::error::LoopError;
use crate::provider::{fixed_provider, ScriptedProvider};
use crate::tools::builtin::{self, BuiltinOptions};
use crate::tools::ToolRegistry;
use crate::tracker::ToolExecutionTracker;
use crate::transport::RunEvent;

/// Config from `path` if given, otherwise the default layering.
pub fn load_config(path: Option<&Path>) -> Result<LoopConfig, LoopError> {
    match path {
        Some(path) => {
            let mut config = LoopConfig::from_toml_file(path)?;
            config.apply_env();
            Ok(config)
        }
        None => LoopConfig::load(),
    }
}

pub fn list_agents(json: bool) -> Result<(), LoopError> {
    let store = InMemoryAgentStore::with_defaults();
    let mut out = std::io::stdout().lock();
    for agent in store.list() {
        if json {
            writeln!(out, "{}", serde_json::to_string(&agent)?)?;
        } else {
            writeln!(
                out,
                "{:<16} {:<10} [{}]  {}",
                agent.id,
                agent.model,
                agent.tools.join(", "),
                agent.description
            )?;
        }
    }
    Ok(())
}

pub fn list_tools(json: bool) -> Result<(), LoopError> {
    let registry = ToolRegistry::with_builtins();
    let mut out = std::io::stdout().lock();
    for entry in registry.catalog() {
        if json {
            writeln!(out, "{}", serde_json::to_string(&entry)?)?;
        } else {
            writeln!(out, "{:<18} {}", entry.name, entry.description)?;
        }
    }
    Ok(())
}

/// Run one agent to completion, streaming events to the terminal.
pub async fn run(args: RunArgs, mut config: LoopConfig, json: bool) -> Result<RunStatus, LoopError> {
    let script_path = args.script.ok_or_else(|| {
        LoopError::Configuration("no model backend configured; pass --script <turns.json>".into())
    })?;
    let provider = ScriptedProvider::from_json(&std::fs::read_to_string(&script_path)?)?;
    if let Some(max_steps) = args.max_steps {
        config.max_steps = max_steps;
    }

    let registry = builtin::register_all_with(
        ToolRegistry::builder(),
        BuiltinOptions {
            simulate_latency: !args.fast,
        },
    )
    .build()?;
    let resolver = AgentResolver::new(
        Arc::new(InMemoryAgentStore::with_defaults()),
        Arc::new(registry),
    );
    let runner = LoopRunner::new(resolver, fixed_provider(Arc::new(provider)), config);

    let mut handle = runner.start(RunRequest::prompt(args.agent, args.prompt)).await?;
    let mut events = handle
        .take_events()
        .ok_or_else(|| LoopError::InvalidState("event stream already taken".into()))?;

    let cancel = handle.cancellation_token();
    let budget = config.run_budget();
    let budget_timer = tokio::spawn(async move {
        tokio::time::sleep(budget).await;
        tracing::warn!(budget_ms = budget.as_millis() as u64, "run budget exhausted; cancelling");
        cancel.cancel();
    });

    let mut tracker = ToolExecutionTracker::new();
    let mut out = std::io::stdout();
    while let Some(envelope) = events.next().await {
        tracker.apply(&envelope);
        if json {
            out.write_all(envelope.to_json_line()?.as_bytes())?;
            continue;
        }
        match &envelope.event {
            RunEvent::TextDelta { text } => {
                write!(out, "{text}")?;
                out.flush()?;
            }
            RunEvent::ToolCallStarted { id, name, .. } => eprintln!("\n⚡ {name} ({id})"),
            RunEvent::ToolCallCompleted { output, .. } => {
                eprintln!("  ✅ {}", truncate(&output.to_string(), 200))
            }
            RunEvent::ToolCallFailed { error, .. } => eprintln!("  ❌ {error}"),
            RunEvent::StepBoundary { step } => eprintln!("\n-- step {step} --"),
            RunEvent::RunCompleted { .. } => writeln!(out)?,
            RunEvent::RunFailed { reason } => eprintln!("\n❌ {reason}"),
            RunEvent::RunAborted { reason } => eprintln!("\n⏹ {reason}"),
        }
    }
    budget_timer.abort();

    let result = handle.wait().await;
    if !json {
        let summary = tracker.summary();
        eprintln!(
            "{} after {} step(s); tools: {} completed, {} failed",
            result.status, result.steps, summary.completed, summary.failed
        );
    }
    Ok(result.status)
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo", 2), "h...");
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, LoopError::Io(_)));
    }

    #[tokio::test]
    async fn run_without_script_is_a_configuration_error() {
        let args = RunArgs {
            agent: "code-agent".into(),
            script: None,
            max_steps: None,
            fast: true,
            prompt: "hi".into(),
        };
        let err = run(args, LoopConfig::default(), true).await.unwrap_err();
        assert!(matches!(err, LoopError::Configuration(_)));
    }

    #[tokio::test]
    async fn run_with_script_completes() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("turns.json");
        std::fs::write(
            &script,
            r#"[{"tool_calls":[{"name":"calculate","input":{"expression":"2+2"}}]},{"text":"4"}]"#,
        )
        .unwrap();
        let args = RunArgs {
            agent: "code-agent".into(),
            script: Some(script),
            max_steps: Some(3),
            fast: true,
            prompt: "2+2".into(),
        };

        let status = run(args, LoopConfig::default(), true).await.unwrap();
        assert_eq!(status, RunStatus::Completed);
    }
}
