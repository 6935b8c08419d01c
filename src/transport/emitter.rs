//! Channel between the controller and the consumer.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use super::events::{RunEnvelope, RunEvent};

/// Create the emitter/stream pair for one run.
pub fn event_channel(run_id: Uuid) -> (RunEventEmitter, RunEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RunEventEmitter {
            run_id,
            seq: AtomicU64::new(1),
            tx,
        },
        RunEvents {
            inner: UnboundedReceiverStream::new(rx),
        },
    )
}

/// Controller-side writer. Events are numbered in emission order.
pub struct RunEventEmitter {
    run_id: Uuid,
    seq: AtomicU64,
    tx: mpsc::UnboundedSender<RunEnvelope>,
}

impl RunEventEmitter {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Emit an event. A consumer that went away is not an error for the run.
    pub fn emit(&self, event: RunEvent) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let envelope = RunEnvelope {
            run_id: self.run_id,
            seq,
            timestamp: chrono::Utc::now(),
            event,
        };
        if self.tx.send(envelope).is_err() {
            tracing::trace!(run_id = %self.run_id, seq, "run event dropped; consumer closed");
        }
    }
}

/// Consumer-side stream of envelopes. Ends after the run's terminal event.
pub struct RunEvents {
    inner: UnboundedReceiverStream<RunEnvelope>,
}

impl std::fmt::Debug for RunEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunEvents").finish_non_exhaustive()
    }
}

impl Stream for RunEvents {
    type Item = RunEnvelope;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn numbers_events_in_order_and_closes_when_emitter_drops() {
        let (emitter, events) = event_channel(Uuid::new_v4());
        emitter.emit(RunEvent::TextDelta { text: "a".into() });
        emitter.emit(RunEvent::StepBoundary { step: 2 });
        drop(emitter);

        let received: Vec<RunEnvelope> = events.collect().await;
        let seqs: Vec<u64> = received.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn emitting_after_consumer_drop_is_silent() {
        let (emitter, events) = event_channel(Uuid::new_v4());
        drop(events);
        emitter.emit(RunEvent::RunFailed { reason: "x".into() });
    }
}
