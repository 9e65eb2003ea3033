//! PIN verification gate.
//!
//! Check order matters: role sufficiency is decided **before** any hash
//! comparison, so a caller whose role can never authorize the action learns
//! nothing about whether the PIN they hold is correct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Money, UserId};
use shopledger_events::{EventBus, publish_best_effort};

use crate::action::{PinProtectedAction, PinSeverity};
use crate::audit::{FraudAlertRaised, PinAttempted, SecurityEvent};
use crate::pin::verify_pin;
use crate::role::ActorRole;
use crate::settings::SecuritySettings;
use crate::throttle::FailureTracker;

/// Numeric context for conditional actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionContext {
    /// Discount percentage being applied.
    DiscountPercent(f64),
    /// Difference between counted and expected till cash.
    CashDelta(Money),
    /// Transaction amount seeking approval.
    Amount(Money),
}

/// Outcome of one verification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinVerificationResult {
    pub authorized: bool,
    pub actor: UserId,
    pub role: ActorRole,
    pub action: PinProtectedAction,
    pub verified_at: DateTime<Utc>,
    pub reason: Option<String>,
}

impl PinVerificationResult {
    /// Turn a denial into the error callers propagate. Denials are never
    /// auto-retried.
    pub fn require(self) -> DomainResult<Self> {
        if self.authorized {
            Ok(self)
        } else {
            Err(DomainError::denied(
                self.reason
                    .unwrap_or_else(|| "PIN verification failed".to_string()),
            ))
        }
    }
}

/// The tenant's PIN gate: settings, the failure throttle and the audit bus.
///
/// `verify` takes `&self`; the throttle uses interior mutability so one
/// gate instance can serve concurrent callers.
#[derive(Debug)]
pub struct PinGate<B> {
    settings: SecuritySettings,
    audit: B,
    attempts: FailureTracker,
}

impl<B> PinGate<B>
where
    B: EventBus<SecurityEvent>,
{
    pub fn new(settings: SecuritySettings, audit: B) -> Self {
        Self {
            settings,
            audit,
            attempts: FailureTracker::new(),
        }
    }

    pub fn settings(&self) -> &SecuritySettings {
        &self.settings
    }

    /// Verify one attempt to perform a protected action.
    ///
    /// Every call, authorized or not, is published to the audit bus
    /// best-effort; a critical-severity success additionally raises a
    /// fraud-alert signal. Neither publish can fail this call.
    pub fn verify(
        &self,
        action: PinProtectedAction,
        supplied_pin: Option<&str>,
        actor: UserId,
        role: ActorRole,
        context: Option<ActionContext>,
        now: DateTime<Utc>,
    ) -> PinVerificationResult {
        // Conditional actions below their threshold need no PIN at all.
        if action.is_conditional() && !self.threshold_crossed(action, context) {
            return self.conclude(
                action,
                actor,
                role,
                true,
                Some("threshold not crossed; no PIN required".to_string()),
                now,
            );
        }

        if !self.settings.requires_pin(action) {
            return self.conclude(
                action,
                actor,
                role,
                true,
                Some("PIN requirement disabled for this action".to_string()),
                now,
            );
        }

        // Role sufficiency first: an insufficient role is denied before the
        // hash is ever consulted.
        if !role.satisfies(action) {
            self.attempts
                .record_failure(actor, action, now, &self.settings.throttle);
            return self.conclude(
                action,
                actor,
                role,
                false,
                Some(format!("{role} cannot authorize '{action}'")),
                now,
            );
        }

        if self
            .attempts
            .is_locked_out(actor, action, now, &self.settings.throttle)
        {
            return self.conclude(
                action,
                actor,
                role,
                false,
                Some("too many failed attempts; try again later".to_string()),
                now,
            );
        }

        let Some(pin) = supplied_pin else {
            return self.conclude(
                action,
                actor,
                role,
                false,
                Some("PIN required".to_string()),
                now,
            );
        };

        if verify_pin(pin, &self.settings.owner_pin_hash) {
            self.attempts.clear(actor, action);
            let result = self.conclude(action, actor, role, true, None, now);
            if action.severity() == PinSeverity::Critical {
                publish_best_effort(
                    &self.audit,
                    SecurityEvent::FraudAlertRaised(FraudAlertRaised {
                        tenant_id: self.settings.tenant_id,
                        actor,
                        action,
                        severity: action.severity(),
                        occurred_at: now,
                    }),
                );
            }
            result
        } else {
            self.attempts
                .record_failure(actor, action, now, &self.settings.throttle);
            self.conclude(
                action,
                actor,
                role,
                false,
                Some("incorrect PIN".to_string()),
                now,
            )
        }
    }

    fn threshold_crossed(
        &self,
        action: PinProtectedAction,
        context: Option<ActionContext>,
    ) -> bool {
        match (action, context) {
            (PinProtectedAction::DiscountExceeded, Some(ActionContext::DiscountPercent(p))) => {
                p > self.settings.max_discount_percent
            }
            (PinProtectedAction::CashMismatch, Some(ActionContext::CashDelta(delta))) => {
                delta.abs() > self.settings.cash_mismatch_tolerance
            }
            (PinProtectedAction::LargeTransaction, Some(ActionContext::Amount(amount))) => {
                amount > self.settings.approval_amount_threshold
            }
            // No (or mismatched) context: fail safe and require the PIN.
            _ => true,
        }
    }

    fn conclude(
        &self,
        action: PinProtectedAction,
        actor: UserId,
        role: ActorRole,
        authorized: bool,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> PinVerificationResult {
        publish_best_effort(
            &self.audit,
            SecurityEvent::PinAttempted(PinAttempted {
                tenant_id: self.settings.tenant_id,
                actor,
                role,
                action,
                authorized,
                reason: reason.clone(),
                occurred_at: now,
            }),
        );
        PinVerificationResult {
            authorized,
            actor,
            role,
            action,
            verified_at: now,
            reason,
        }
    }
}
