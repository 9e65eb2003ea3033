//! `shopledger-events` — event contracts and the audit-grade pub/sub bus.
//!
//! Audit trails and fraud signals are delivered over this bus as
//! fire-and-forget side effects: they must never block, delay, or roll back
//! the business transaction that emitted them.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription, publish_best_effort};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
