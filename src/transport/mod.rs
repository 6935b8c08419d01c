//! Ordered run event stream: controller-side emitter and consumer-side stream.

pub mod emitter;
pub mod events;

pub use emitter::{event_channel, RunEventEmitter, RunEvents};
pub use events::{AbortReason, RunEnvelope, RunEvent};
