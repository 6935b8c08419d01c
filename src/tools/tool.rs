//! The `Tool` seam and a closure-backed implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::LoopError;
use crate::provider::ToolDefinition;

/// Where a call sits within its run.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    pub tool_call_id: String,
    pub agent_id: String,
    /// 1-based step whose model turn requested the call.
    pub step: usize,
}

/// A named capability the model may call.
///
/// Implementations are shared across concurrent runs through the registry,
/// so `execute` takes `&self` and must not rely on per-run mutable state.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key; the name the model uses in its tool calls.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Input schema. The dispatcher validates against it before `execute`.
    fn parameters(&self) -> &ToolParameters;

    /// Handler timeout for this tool. `None` uses the run's configured default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// What the provider is told about this tool.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
        }
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, LoopError>;
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, LoopError>> + Send>>;
type Handler = dyn Fn(ToolArguments, ToolExecutionContext) -> HandlerFuture + Send + Sync;

/// Tool backed by an async closure.
#[derive(Clone)]
pub struct AgentTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    timeout: Option<Duration>,
    handler: Arc<Handler>,
}

impl AgentTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LoopError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            timeout: None,
            handler: Arc::new(move |args, ctx| -> HandlerFuture { Box::pin(handler(args, ctx)) }),
        }
    }

    /// Override the dispatcher's default handler timeout for this tool.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, LoopError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
