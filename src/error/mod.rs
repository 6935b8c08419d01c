//! Error types for the step loop.

pub mod tool;

pub use tool::{ToolError, ToolErrorKind};

use thiserror::Error;

/// Primary error type for steploop operations.
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Configuration,
    Serialization,
    ToolExecution,
    Provider,
    Unknown,
}

impl LoopError {
    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AgentNotFound(_) => ErrorCategory::NotFound,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::ToolExecution { .. } | Self::InvalidArgument(_) => ErrorCategory::ToolExecution,
            Self::Provider { .. } => ErrorCategory::Provider,
            _ => ErrorCategory::Unknown,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LoopError>;
