//! Immutability guard: may this bill be edited or deleted right now?
//!
//! The guard only answers; it never grants. A denial with
//! `pin_can_override = true` can be converted into an allowance solely by
//! the PIN gate, inside the same logical transaction as the mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_security::{PinProtectedAction, SecuritySettings};

use crate::bill::Bill;
use crate::state::BillState;

/// The mutation being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillMutation {
    Edit,
    Delete,
}

impl BillMutation {
    pub fn display_name(self) -> &'static str {
        match self {
            BillMutation::Edit => "edit",
            BillMutation::Delete => "delete",
        }
    }
}

/// The guard's verdict.
///
/// `pin_can_override` is informational: it tells the caller whether asking
/// the PIN gate could help. It never itself grants access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationCheck {
    pub allowed: bool,
    pub reason: String,
    pub pin_can_override: bool,
    /// Which protected action an override must verify as.
    pub override_action: Option<PinProtectedAction>,
    pub state: BillState,
}

impl MutationCheck {
    fn allowed(state: BillState, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            pin_can_override: false,
            override_action: None,
            state,
        }
    }

    fn denied(state: BillState, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            pin_can_override: false,
            override_action: None,
            state,
        }
    }

    fn overridable(
        state: BillState,
        reason: impl Into<String>,
        action: PinProtectedAction,
    ) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            pin_can_override: true,
            override_action: Some(action),
            state,
        }
    }
}

/// Whether `now` is still inside the tenant's free edit window.
fn within_edit_window(bill: &Bill, settings: &SecuritySettings, now: DateTime<Utc>) -> bool {
    bill.opened_at()
        .is_some_and(|opened| now - opened <= settings.edit_window())
}

pub fn check_edit(bill: &Bill, settings: &SecuritySettings, now: DateTime<Utc>) -> MutationCheck {
    let state = BillState::of(bill);
    match state {
        BillState::GstFiled => MutationCheck::denied(
            state,
            "tax-filed documents are permanently frozen; no authorization can edit them",
        ),
        BillState::Draft => MutationCheck::allowed(state, "drafts can always be edited"),
        BillState::Unpaid => {
            if within_edit_window(bill, settings, now) {
                MutationCheck::allowed(state, "within the edit window")
            } else {
                MutationCheck::overridable(
                    state,
                    "the edit window has closed; owner PIN required",
                    PinProtectedAction::BillEdit,
                )
            }
        }
        BillState::Paid | BillState::Printed => MutationCheck::overridable(
            state,
            format!("{state} bills require owner PIN to edit"),
            PinProtectedAction::BillEdit,
        ),
    }
}

/// Deletion is stricter than editing at every state; the edit window never
/// applies to it.
pub fn check_delete(
    bill: &Bill,
    _settings: &SecuritySettings,
    _now: DateTime<Utc>,
) -> MutationCheck {
    let state = BillState::of(bill);
    match state {
        BillState::GstFiled => MutationCheck::denied(
            state,
            "tax-filed documents are permanently frozen; no authorization can delete them",
        ),
        BillState::Draft => MutationCheck::allowed(state, "drafts can always be deleted"),
        BillState::Unpaid => MutationCheck::overridable(
            state,
            "deleting a billed document requires owner PIN",
            PinProtectedAction::BillDelete,
        ),
        BillState::Paid | BillState::Printed => MutationCheck::denied(
            state,
            format!("{state} bills can never be deleted; post a reversal instead"),
        ),
    }
}
