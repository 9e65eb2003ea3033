//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Infrastructure
/// concerns belong elsewhere. An insufficient-stock allocation is deliberately
/// NOT represented here: it is a degraded-success outcome carried on the
/// allocation result, not a failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, negative quantity).
    /// Rejected before any side effect.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Journal-math contract violated: debit and credit totals differ.
    /// Fatal to the posting; no ledger mutation is observable.
    #[error("unbalanced entry: debits {debits} != credits {credits}")]
    UnbalancedEntry {
        /// Total debits in minor currency units.
        debits: i64,
        /// Total credits in minor currency units.
        credits: i64,
    },

    /// A journal line references an account absent for the tenant.
    #[error("unknown ledger account: {0}")]
    UnknownLedger(String),

    /// The entry date falls inside a closed accounting period.
    #[error("locked period: {0}")]
    LockedPeriod(String),

    /// An edit/delete was denied by the document's current state.
    /// Recoverable by obtaining authorization or posting a reversal instead.
    #[error("immutability violation: {0}")]
    ImmutabilityViolation(String),

    /// Wrong PIN or insufficient role. Always logged, never auto-retried.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Optimistic-concurrency failure (e.g. stale version on batch stock).
    /// Callers retry with fresh data up to a bounded count.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn unknown_ledger(msg: impl Into<String>) -> Self {
        Self::UnknownLedger(msg.into())
    }

    pub fn locked_period(msg: impl Into<String>) -> Self {
        Self::LockedPeriod(msg.into())
    }

    pub fn immutability(msg: impl Into<String>) -> Self {
        Self::ImmutabilityViolation(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        Self::AuthorizationDenied(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
