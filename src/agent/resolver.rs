//! Resolve an agent id into everything a run needs.

use std::sync::Arc;

use super::definition::AgentDefinition;
use super::route::ProviderRoute;
use super::store::AgentStore;
use crate::error::{LoopError, Result};
use crate::tools::ToolRegistry;

/// Agent definition narrowed to the tools that actually exist.
#[derive(Debug, Clone)]
pub struct ResolvedAgent {
    pub definition: AgentDefinition,
    /// Declared tool ids present in the registry, in declaration order.
    pub enabled_tools: Vec<String>,
    pub route: ProviderRoute,
}

impl ResolvedAgent {
    pub fn is_tool_enabled(&self, name: &str) -> bool {
        self.enabled_tools.iter().any(|tool| tool == name)
    }
}

/// Looks up agents and filters their tools against the registry.
#[derive(Clone)]
pub struct AgentResolver {
    store: Arc<dyn AgentStore>,
    registry: Arc<ToolRegistry>,
}

impl AgentResolver {
    pub fn new(store: Arc<dyn AgentStore>, registry: Arc<ToolRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn AgentStore> {
        &self.store
    }

    /// Resolve `agent_id`. Unknown tool ids are dropped rather than failing the run.
    pub fn resolve(&self, agent_id: &str) -> Result<ResolvedAgent> {
        let definition = self
            .store
            .get(agent_id)
            .ok_or_else(|| LoopError::AgentNotFound(agent_id.to_string()))?;

        let mut enabled_tools: Vec<String> = Vec::with_capacity(definition.tools.len());
        for tool_id in &definition.tools {
            if !self.registry.contains(tool_id) {
                tracing::debug!(agent_id, tool = %tool_id, "dropping unknown tool from agent");
                continue;
            }
            if !enabled_tools.contains(tool_id) {
                enabled_tools.push(tool_id.clone());
            }
        }

        let route = ProviderRoute::resolve(&definition.model);
        Ok(ResolvedAgent {
            definition,
            enabled_tools,
            route,
        })
    }
}
