//! Tool system: trait, schemas, validation, registry and built-in tools.

pub mod arguments;
pub mod builtin;
pub mod expr;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::{ToolCatalogEntry, ToolRegistry};
pub use tool::{AgentTool, Tool, ToolExecutionContext};
pub use types::ToolParameters;
