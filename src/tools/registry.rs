//! Read-only tool registry shared by every run.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tool::Tool;
use crate::error::LoopError;
use crate::provider::ToolDefinition;

/// Public description of a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCatalogEntry {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Mapping of tool name to tool implementation.
///
/// Built once with [`ToolRegistry::builder`] and immutable afterwards; wrap it
/// in an `Arc` to share it across concurrent runs.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Registry holding the built-in tools.
    pub fn with_builtins() -> Self {
        super::builtin::register_all(Self::builder())
            .build()
            .unwrap_or_default()
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tools, sorted by name.
    pub fn catalog(&self) -> Vec<ToolCatalogEntry> {
        let mut entries: Vec<ToolCatalogEntry> = self
            .tools
            .values()
            .map(|tool| {
                let definition = tool.definition();
                ToolCatalogEntry {
                    name: definition.name,
                    description: definition.description,
                    input_schema: definition.parameters,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Provider-facing definitions for `names`, in the given order. Unknown names are skipped.
    pub fn definitions_for(&self, names: &[String]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

/// Collects tools before the registry is frozen.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Freeze the registry. Duplicate or empty names are rejected.
    pub fn build(self) -> Result<ToolRegistry, LoopError> {
        let mut tools = HashMap::with_capacity(self.tools.len());
        for tool in self.tools {
            let name = tool.name().to_string();
            if name.trim().is_empty() {
                return Err(LoopError::Configuration(
                    "tool name must not be empty".to_string(),
                ));
            }
            if tools.insert(name.clone(), tool).is_some() {
                return Err(LoopError::Configuration(format!(
                    "tool '{name}' registered twice"
                )));
            }
        }
        Ok(ToolRegistry { tools })
    }
}
