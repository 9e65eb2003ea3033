//! Audit and fraud signals emitted by the gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopledger_core::{AggregateId, TenantId, UserId};
use shopledger_events::{Event, EventEnvelope, Subscription};

use crate::action::{PinProtectedAction, PinSeverity};
use crate::role::ActorRole;

/// One PIN verification attempt, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinAttempted {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub role: ActorRole,
    pub action: PinProtectedAction,
    pub authorized: bool,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Raised on every critical-severity success. Delivery (SMS, push, email)
/// is someone else's problem; this is the signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAlertRaised {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub action: PinProtectedAction,
    pub severity: PinSeverity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SecurityEvent {
    PinAttempted(PinAttempted),
    FraudAlertRaised(FraudAlertRaised),
}

impl Event for SecurityEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SecurityEvent::PinAttempted(_) => "security.pin.attempted",
            SecurityEvent::FraudAlertRaised(_) => "security.fraud.alert_raised",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SecurityEvent::PinAttempted(e) => e.occurred_at,
            SecurityEvent::FraudAlertRaised(e) => e.occurred_at,
        }
    }
}

/// Append-only audit trail for one tenant.
///
/// Drains a bus subscription into sequence-numbered envelopes, outside the
/// transaction that emitted the signals: the sink is best-effort-but-
/// monitored and can never roll anything back.
#[derive(Debug)]
pub struct AuditTrail {
    tenant_id: TenantId,
    entries: Vec<EventEnvelope<SecurityEvent>>,
}

impl AuditTrail {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            entries: Vec::new(),
        }
    }

    /// Append everything currently queued on the subscription. Returns how
    /// many records were written.
    pub fn ingest(
        &mut self,
        subscription: &Subscription<SecurityEvent>,
        now: DateTime<Utc>,
    ) -> usize {
        let mut appended = 0;
        for event in subscription.drain() {
            let sequence_number = self.entries.len() as u64 + 1;
            self.entries.push(EventEnvelope::new(
                Uuid::now_v7(),
                self.tenant_id,
                AggregateId::from_uuid(*self.tenant_id.as_uuid()),
                "security.audit",
                sequence_number,
                now,
                event,
            ));
            appended += 1;
        }
        appended
    }

    pub fn entries(&self) -> &[EventEnvelope<SecurityEvent>] {
        &self.entries
    }
}
