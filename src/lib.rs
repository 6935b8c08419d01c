//! Steploop: a bounded, step-based agent execution loop.
//!
//! A run alternates between one model invocation and one concurrent batch of
//! tool calls until the model answers without requesting tools, the step
//! bound is hit, the caller cancels, or the model call fails. Every run
//! yields an ordered event stream and exactly one terminal event.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use steploop::prelude::*;
//! use steploop::provider::{fixed_provider, ScriptedProvider, ScriptedTurn};
//!
//! # async fn example() -> steploop::error::Result<()> {
//! let resolver = AgentResolver::new(
//!     Arc::new(InMemoryAgentStore::with_defaults()),
//!     Arc::new(ToolRegistry::with_builtins()),
//! );
//! let provider = ScriptedProvider::new(vec![
//!     ScriptedTurn::tool_call("calculate", serde_json::json!({ "expression": "2+2" })),
//!     ScriptedTurn::text("The result is 4"),
//! ]);
//! let runner = LoopRunner::new(resolver, fixed_provider(Arc::new(provider)), LoopConfig::load()?);
//!
//! let handle = runner.start(RunRequest::prompt("code-agent", "What is 2+2?")).await?;
//! let (events, result) = handle.collect().await;
//! println!("{} events, answer: {}", events.len(), result.final_text);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod tracker;
pub mod transport;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
