//! Derived bill lifecycle state.

use serde::{Deserialize, Serialize};

use crate::bill::{Bill, BillStatus};

/// The bill's position in the lock ladder, non-decreasing in strictness,
/// with the tax-filed state absorbing.
///
/// Never stored: always a pure function of the document's facts. Paid and
/// printed are both locked states but not ordered relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillState {
    Draft,
    Unpaid,
    Paid,
    Printed,
    GstFiled,
}

impl BillState {
    /// Derive the state from (status, print count, paid amount, filed flag).
    pub fn of(bill: &Bill) -> BillState {
        if bill.is_gst_filed() {
            BillState::GstFiled
        } else if bill.print_count() > 0 {
            BillState::Printed
        } else if !bill.paid_amount().is_zero()
            || matches!(bill.status(), BillStatus::Paid | BillStatus::Partial)
        {
            BillState::Paid
        } else if bill.status() == BillStatus::Draft {
            BillState::Draft
        } else {
            BillState::Unpaid
        }
    }

    /// States that require authorization before any mutation.
    pub fn is_locked(self) -> bool {
        match self {
            BillState::Draft | BillState::Unpaid => false,
            BillState::Paid | BillState::Printed | BillState::GstFiled => true,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BillState::Draft => "Draft",
            BillState::Unpaid => "Unpaid",
            BillState::Paid => "Paid",
            BillState::Printed => "Printed",
            BillState::GstFiled => "GST Filed",
        }
    }
}

impl core::fmt::Display for BillState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.display_name())
    }
}
