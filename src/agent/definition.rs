//! Agent definition records.

use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable configuration describing how a run behaves.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    #[builder(into)]
    pub id: String,
    #[builder(into)]
    pub name: String,
    #[builder(into, default)]
    #[serde(default)]
    pub description: String,
    /// Model identifier as configured (e.g. `gpt-4o`), before routing.
    #[builder(into)]
    pub model: String,
    #[builder(into, default)]
    #[serde(default)]
    pub system_prompt: String,
    /// Declared tool ids, in the order the agent lists them.
    #[builder(default)]
    #[serde(default)]
    pub tools: Vec<String>,
    #[builder(default = Utc::now())]
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl AgentDefinition {
    /// Research agent seeded into the default store.
    pub fn research_assistant() -> Self {
        Self::builder()
            .id("research-agent")
            .name("Research Assistant")
            .description("An agent that helps with web research and data gathering")
            .model("gpt-4o")
            .system_prompt(
                "You are a helpful research assistant. Use the available tools to find and analyze information for the user.",
            )
            .tools(vec!["web-search".to_string(), "file-search".to_string()])
            .build()
    }

    /// Coding agent seeded into the default store.
    pub fn code_helper() -> Self {
        Self::builder()
            .id("code-agent")
            .name("Code Helper")
            .description("An agent for coding assistance and code execution")
            .model("gpt-4o")
            .system_prompt("You are a coding assistant. Help users write, debug, and execute code.")
            .tools(vec!["code-interpreter".to_string(), "calculate".to_string()])
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_records_with_defaults() {
        let agent: AgentDefinition = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "name": "Minimal",
            "model": "claude-3-5-sonnet",
            "systemPrompt": "Be brief.",
        }))
        .unwrap();

        assert_eq!(agent.system_prompt, "Be brief.");
        assert!(agent.tools.is_empty());
        assert!(agent.description.is_empty());
    }
}
