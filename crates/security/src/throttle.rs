//! Failed-attempt throttling per actor and action.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use shopledger_core::UserId;

use crate::action::PinProtectedAction;
use crate::settings::ThrottlePolicy;

/// Sliding-window failure counter keyed by (actor, action).
///
/// Interior mutability so the gate can record attempts through a shared
/// reference; a poisoned lock degrades to "no throttle" rather than
/// blocking verification.
#[derive(Debug, Default)]
pub struct FailureTracker {
    attempts: Mutex<HashMap<(UserId, PinProtectedAction), Vec<DateTime<Utc>>>>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(
        &self,
        actor: UserId,
        action: PinProtectedAction,
        now: DateTime<Utc>,
        policy: &ThrottlePolicy,
    ) {
        let Ok(mut attempts) = self.attempts.lock() else {
            return;
        };
        let list = attempts.entry((actor, action)).or_default();
        list.retain(|t| *t + policy.window() > now);
        list.push(now);
    }

    /// Locked out when the window holds `max_failures` or more and the
    /// cooldown since the most recent failure has not elapsed.
    pub fn is_locked_out(
        &self,
        actor: UserId,
        action: PinProtectedAction,
        now: DateTime<Utc>,
        policy: &ThrottlePolicy,
    ) -> bool {
        let Ok(mut attempts) = self.attempts.lock() else {
            return false;
        };
        let Some(list) = attempts.get_mut(&(actor, action)) else {
            return false;
        };
        list.retain(|t| *t + policy.window() > now);
        if (list.len() as u32) < policy.max_failures {
            return false;
        }
        list.last()
            .is_some_and(|last| now < *last + policy.cooldown())
    }

    /// A successful verification resets the counter.
    pub fn clear(&self, actor: UserId, action: PinProtectedAction) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.remove(&(actor, action));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy() -> ThrottlePolicy {
        ThrottlePolicy {
            max_failures: 3,
            window_secs: 60,
            cooldown_secs: 120,
        }
    }

    #[test]
    fn lockout_trips_after_max_failures() {
        let tracker = FailureTracker::new();
        let actor = UserId::new();
        let action = PinProtectedAction::BillEdit;
        let now = Utc::now();
        let policy = policy();

        for i in 0..3 {
            assert!(!tracker.is_locked_out(actor, action, now, &policy));
            tracker.record_failure(actor, action, now + Duration::seconds(i), &policy);
        }
        assert!(tracker.is_locked_out(actor, action, now + Duration::seconds(3), &policy));
    }

    #[test]
    fn lockout_releases_after_cooldown() {
        let tracker = FailureTracker::new();
        let actor = UserId::new();
        let action = PinProtectedAction::BillEdit;
        let now = Utc::now();
        let policy = policy();

        for _ in 0..3 {
            tracker.record_failure(actor, action, now, &policy);
        }
        assert!(tracker.is_locked_out(actor, action, now, &policy));
        assert!(!tracker.is_locked_out(actor, action, now + Duration::seconds(121), &policy));
    }

    #[test]
    fn success_clears_the_counter() {
        let tracker = FailureTracker::new();
        let actor = UserId::new();
        let action = PinProtectedAction::BillEdit;
        let now = Utc::now();
        let policy = policy();

        for _ in 0..3 {
            tracker.record_failure(actor, action, now, &policy);
        }
        tracker.clear(actor, action);
        assert!(!tracker.is_locked_out(actor, action, now, &policy));
    }

    #[test]
    fn counters_are_scoped_per_actor_and_action() {
        let tracker = FailureTracker::new();
        let actor = UserId::new();
        let other = UserId::new();
        let now = Utc::now();
        let policy = policy();

        for _ in 0..3 {
            tracker.record_failure(actor, PinProtectedAction::BillEdit, now, &policy);
        }
        assert!(!tracker.is_locked_out(other, PinProtectedAction::BillEdit, now, &policy));
        assert!(!tracker.is_locked_out(actor, PinProtectedAction::BillDelete, now, &policy));
    }
}
