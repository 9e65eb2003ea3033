//! `shopledger-security` — the PIN authorization gate.
//!
//! The sole mechanism that can convert an otherwise-denied mutation into an
//! allowed one, and the sole source of audit/fraud signals. Decoupled from
//! HTTP and storage; callers hand in business time explicitly.

pub mod action;
pub mod audit;
pub mod gate;
pub mod pin;
pub mod role;
pub mod settings;
pub mod throttle;

pub use action::{PinProtectedAction, PinSeverity};
pub use audit::{AuditTrail, FraudAlertRaised, PinAttempted, SecurityEvent};
pub use gate::{ActionContext, PinGate, PinVerificationResult};
pub use pin::{PinHash, hash_pin, verify_pin};
pub use role::ActorRole;
pub use settings::{SecuritySettings, ThrottlePolicy};
pub use throttle::FailureTracker;
