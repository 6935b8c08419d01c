//! Convenience re-exports for common use.

pub use crate::agent::{AgentDefinition, AgentResolver, AgentStore, InMemoryAgentStore};
pub use crate::agent_loop::{LoopRunner, RunHandle, RunRequest, RunResult, RunStatus, Runner};
pub use crate::config::LoopConfig;
pub use crate::error::{LoopError, Result, ToolError, ToolErrorKind};
pub use crate::provider::{ModelProvider, ProviderRequest};
pub use crate::tools::{AgentTool, Tool, ToolArguments, ToolParameters, ToolRegistry};
pub use crate::tracker::{ToolExecutionTracker, Transcript};
pub use crate::transport::{AbortReason, RunEnvelope, RunEvent};
pub use crate::types::{ConversationMessage, Role, ToolCallStatus};
