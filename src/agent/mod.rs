//! Agent definitions, their store, and run-time resolution.

pub mod definition;
pub mod resolver;
pub mod route;
pub mod store;

pub use definition::AgentDefinition;
pub use resolver::{AgentResolver, ResolvedAgent};
pub use route::{ProviderKey, ProviderRoute};
pub use store::{AgentStore, InMemoryAgentStore};
