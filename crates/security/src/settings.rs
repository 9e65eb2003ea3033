//! Per-tenant security settings.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use shopledger_core::{Money, TenantId};

use crate::action::{PinProtectedAction, PinSeverity};
use crate::pin::PinHash;

/// Tenant-configurable throttling of failed PIN attempts.
///
/// Deliberately a policy object, not hardcoded backoff: tenants tune it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlePolicy {
    /// Failures within `window` before the lockout trips.
    pub max_failures: u32,
    pub window_secs: u32,
    /// How long the lockout holds after the last failure.
    pub cooldown_secs: u32,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window_secs: 300,
            cooldown_secs: 300,
        }
    }
}

impl ThrottlePolicy {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs as i64)
    }
}

/// One record per tenant: the owner PIN hash plus every threshold the gate
/// and the document guard consult.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySettings {
    pub tenant_id: TenantId,
    pub owner_pin_hash: PinHash,
    /// Discounts above this percentage need a PIN.
    pub max_discount_percent: f64,
    /// Minutes after billing during which edits need no authorization.
    pub bill_edit_window_minutes: i64,
    /// Till-count deltas within this tolerance need no PIN.
    pub cash_mismatch_tolerance: Money,
    /// Transactions above this amount need approval.
    pub approval_amount_threshold: Money,
    /// Per-action requirement toggles. Critical actions ignore these.
    pub action_overrides: HashMap<PinProtectedAction, bool>,
    pub throttle: ThrottlePolicy,
}

impl SecuritySettings {
    pub fn new(tenant_id: TenantId, owner_pin_hash: PinHash) -> Self {
        Self {
            tenant_id,
            owner_pin_hash,
            max_discount_percent: 10.0,
            bill_edit_window_minutes: 30,
            cash_mismatch_tolerance: Money::from_minor(10_000),
            approval_amount_threshold: Money::from_minor(5_000_000),
            action_overrides: HashMap::new(),
            throttle: ThrottlePolicy::default(),
        }
    }

    /// Whether the action requires a PIN at all for this tenant.
    ///
    /// Critical actions cannot be toggled off.
    pub fn requires_pin(&self, action: PinProtectedAction) -> bool {
        if action.severity() == PinSeverity::Critical {
            return true;
        }
        self.action_overrides.get(&action).copied().unwrap_or(true)
    }

    pub fn edit_window(&self) -> Duration {
        Duration::minutes(self.bill_edit_window_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::hash_pin;

    fn settings() -> SecuritySettings {
        SecuritySettings::new(TenantId::new(), hash_pin("4921").unwrap())
    }

    #[test]
    fn actions_require_pin_by_default() {
        let settings = settings();
        for action in PinProtectedAction::ALL {
            assert!(settings.requires_pin(action));
        }
    }

    #[test]
    fn non_critical_actions_can_be_toggled_off() {
        let mut settings = settings();
        settings
            .action_overrides
            .insert(PinProtectedAction::BillEdit, false);
        assert!(!settings.requires_pin(PinProtectedAction::BillEdit));
    }

    #[test]
    fn critical_actions_ignore_toggles() {
        let mut settings = settings();
        settings
            .action_overrides
            .insert(PinProtectedAction::BillDelete, false);
        assert!(settings.requires_pin(PinProtectedAction::BillDelete));
    }
}
