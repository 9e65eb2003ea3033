//! Event publishing/subscription abstraction (mechanics only).
//!
//! A pub/sub mechanism for distributing events to consumers: audit sinks,
//! fraud-alert dispatchers, day-book read models. The bus is intentionally
//! lightweight:
//!
//! - **Transport-agnostic**: in-memory channels here, a queue elsewhere.
//! - **At-least-once**: consumers must be idempotent.
//! - **No persistence**: the bus distributes; sinks store.
//!
//! Audit delivery is best-effort-but-monitored: a failed publish is logged
//! and dropped, never surfaced to the business transaction that emitted it.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every message published to the bus
/// (broadcast semantics). Designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<M> {
        let mut drained = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            drained.push(message);
        }
        drained
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish()` can fail (bus full, transport down). Callers on the business
/// path should use [`publish_best_effort`] instead of propagating that
/// failure: the audit sink contract is that a lost signal is logged and
/// monitored, never able to fail the primary transaction.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}

/// Publish without letting a bus failure reach the caller.
///
/// The failure is recorded via `tracing::warn!` so the sink can be monitored;
/// the emitting transaction proceeds regardless.
pub fn publish_best_effort<M, B>(bus: &B, message: M)
where
    B: EventBus<M>,
{
    if let Err(err) = bus.publish(message) {
        tracing::warn!(error = ?err, "event publish failed; signal dropped");
    }
}
