//! Step loop: one model call per step, tool batches between steps.

pub mod runner;
pub mod types;

pub use runner::{LoopRunner, RunHandle, RunRequest, Runner};
pub use types::{ControllerState, RunId, RunResult, RunState, RunStatus};
