//! Shared test helpers: runner harness over the scripted provider.

#![allow(dead_code)]

use std::sync::Arc;

use steploop::agent::{AgentDefinition, AgentResolver, InMemoryAgentStore};
use steploop::agent_loop::LoopRunner;
use steploop::config::LoopConfig;
use steploop::provider::{fixed_provider, ScriptedProvider, ScriptedTurn};
use steploop::tools::builtin::{self, BuiltinOptions};
use steploop::tools::{AgentTool, ToolRegistry};
use steploop::transport::{RunEnvelope, RunEvent};

/// Built-in tools without simulated latency, plus any extra tools.
pub fn registry_with(extra: Vec<AgentTool>) -> Arc<ToolRegistry> {
    let mut builder = builtin::register_all_with(
        ToolRegistry::builder(),
        BuiltinOptions {
            simulate_latency: false,
        },
    );
    for tool in extra {
        builder = builder.tool(tool);
    }
    Arc::new(builder.build().expect("test registry"))
}

pub struct Harness {
    pub runner: LoopRunner,
    pub provider: Arc<ScriptedProvider>,
}

impl Harness {
    /// Default agents, fast built-ins, default config.
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self::builder(turns).build()
    }

    pub fn builder(turns: Vec<ScriptedTurn>) -> HarnessBuilder {
        HarnessBuilder {
            provider: ScriptedProvider::new(turns),
            agents: vec![
                AgentDefinition::research_assistant(),
                AgentDefinition::code_helper(),
            ],
            tools: Vec::new(),
            config: LoopConfig::default(),
        }
    }
}

pub struct HarnessBuilder {
    provider: ScriptedProvider,
    agents: Vec<AgentDefinition>,
    tools: Vec<AgentTool>,
    config: LoopConfig,
}

impl HarnessBuilder {
    pub fn agent(mut self, agent: AgentDefinition) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn tool(mut self, tool: AgentTool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Harness {
        let provider = Arc::new(self.provider);
        let resolver = AgentResolver::new(
            Arc::new(InMemoryAgentStore::new(self.agents)),
            registry_with(self.tools),
        );
        Harness {
            runner: LoopRunner::new(resolver, fixed_provider(provider.clone()), self.config),
            provider,
        }
    }
}

/// Agent that may use the given tools, routed to `gpt-4o`.
pub fn agent_with_tools(id: &str, tools: &[&str]) -> AgentDefinition {
    AgentDefinition::builder()
        .id(id)
        .name(id)
        .model("gpt-4o")
        .tools(tools.iter().map(|t| t.to_string()).collect())
        .build()
}

pub fn events_only(envelopes: &[RunEnvelope]) -> Vec<RunEvent> {
    envelopes.iter().map(|e| e.event.clone()).collect()
}

/// Short label per event, for order assertions.
pub fn event_kinds(envelopes: &[RunEnvelope]) -> Vec<&'static str> {
    envelopes
        .iter()
        .map(|e| match &e.event {
            RunEvent::TextDelta { .. } => "text",
            RunEvent::ToolCallStarted { .. } => "tool_started",
            RunEvent::ToolCallCompleted { .. } => "tool_completed",
            RunEvent::ToolCallFailed { .. } => "tool_failed",
            RunEvent::StepBoundary { .. } => "step",
            RunEvent::RunCompleted { .. } => "completed",
            RunEvent::RunFailed { .. } => "failed",
            RunEvent::RunAborted { .. } => "aborted",
        })
        .collect()
}

/// Sequence numbers start at 1 and have no gaps; exactly one terminal event, last.
pub fn assert_well_formed(envelopes: &[RunEnvelope]) {
    for (idx, envelope) in envelopes.iter().enumerate() {
        assert_eq!(envelope.seq, idx as u64 + 1, "sequence gap at {idx}");
    }
    let terminals = envelopes.iter().filter(|e| e.event.is_terminal()).count();
    assert_eq!(terminals, 1, "expected exactly one terminal event");
    assert!(envelopes.last().is_some_and(|e| e.event.is_terminal()));
}
