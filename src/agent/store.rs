//! Agent store collaborator.

use std::collections::HashMap;

use super::definition::AgentDefinition;

/// Read access to agent definitions.
pub trait AgentStore: Send + Sync {
    fn get(&self, id: &str) -> Option<AgentDefinition>;

    fn list(&self) -> Vec<AgentDefinition>;
}

/// Agent store held in memory. Constructed once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentStore {
    agents: HashMap<String, AgentDefinition>,
}

impl InMemoryAgentStore {
    pub fn new(agents: impl IntoIterator<Item = AgentDefinition>) -> Self {
        Self {
            agents: agents
                .into_iter()
                .map(|agent| (agent.id.clone(), agent))
                .collect(),
        }
    }

    /// Store seeded with the research and code agents.
    pub fn with_defaults() -> Self {
        Self::new([
            AgentDefinition::research_assistant(),
            AgentDefinition::code_helper(),
        ])
    }
}

impl AgentStore for InMemoryAgentStore {
    fn get(&self, id: &str) -> Option<AgentDefinition> {
        self.agents.get(id).cloned()
    }

    fn list(&self) -> Vec<AgentDefinition> {
        let mut agents: Vec<AgentDefinition> = self.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }
}
