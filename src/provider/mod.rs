//! Model provider capability.
//!
//! The loop never performs inference itself; it drives a [`ModelProvider`]
//! chosen per run from the agent's resolved [`ProviderRoute`].

pub mod scripted;

pub use scripted::{ScriptedProvider, ScriptedToolCall, ScriptedTurn};

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::agent::ProviderRoute;
use crate::error::LoopError;
use crate::types::{ConversationMessage, ModelDelta};

/// A request sent to a model provider for one step.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub route: ProviderRoute,
    pub system_prompt: String,
    pub messages: Vec<ConversationMessage>,
    pub tools: Vec<ToolDefinition>,
    /// 1-based step index this request belongs to.
    pub step: usize,
}

/// Tool definition sent to the provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Stream of incremental model output.
pub type ModelStream = BoxStream<'static, Result<ModelDelta, LoopError>>;

/// Capability implemented by model backends.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &str;

    /// Start generating a response; output arrives incrementally.
    async fn stream(&self, request: &ProviderRequest) -> Result<ModelStream, LoopError>;
}

/// Builds the provider serving a route.
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderRoute) -> Result<Arc<dyn ModelProvider>, LoopError> + Send + Sync>;

/// Factory that serves every route with the same provider instance.
pub fn fixed_provider(provider: Arc<dyn ModelProvider>) -> ProviderFactory {
    Arc::new(move |_route| Ok(provider.clone()))
}
