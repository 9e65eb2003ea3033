//! The closed catalog of PIN-protected actions.

use serde::{Deserialize, Serialize};

/// How damaging a protected action is if misused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinSeverity {
    Medium,
    High,
    Critical,
}

impl PinSeverity {
    pub fn display_name(self) -> &'static str {
        match self {
            PinSeverity::Medium => "Medium",
            PinSeverity::High => "High",
            PinSeverity::Critical => "Critical",
        }
    }
}

/// Sensitive operations the gate knows about.
///
/// A closed set on purpose: adding an action forces every dispatch site
/// (severity, ownership, display, settings toggles) to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinProtectedAction {
    /// Editing a bill once it is outside the free edit window, or once it
    /// is paid/printed.
    BillEdit,
    /// Deleting a billed document. Structurally destructive.
    BillDelete,
    /// A line/bill discount exceeding the configured percentage.
    /// Conditional: no PIN below the threshold.
    DiscountExceeded,
    /// Till count differing from expected cash beyond the tolerance.
    /// Conditional: no PIN within the tolerance.
    CashMismatch,
    /// A transaction amount above the configured approval limit.
    /// Conditional: no PIN below the limit.
    LargeTransaction,
    /// Selling below the recorded rate.
    PriceOverride,
    /// Reopening a closed accounting period.
    PeriodUnlock,
    /// Changing a staff member's role.
    RoleChange,
    /// Closing the financial year.
    YearClose,
    /// Touching a tax-filed document. Catalogued for audit; the document
    /// guard never yields an override for it.
    GstFiledEdit,
    /// Overriding computed totals.
    CalculationOverride,
}

impl PinProtectedAction {
    pub const ALL: [PinProtectedAction; 11] = [
        PinProtectedAction::BillEdit,
        PinProtectedAction::BillDelete,
        PinProtectedAction::DiscountExceeded,
        PinProtectedAction::CashMismatch,
        PinProtectedAction::LargeTransaction,
        PinProtectedAction::PriceOverride,
        PinProtectedAction::PeriodUnlock,
        PinProtectedAction::RoleChange,
        PinProtectedAction::YearClose,
        PinProtectedAction::GstFiledEdit,
        PinProtectedAction::CalculationOverride,
    ];

    pub fn severity(self) -> PinSeverity {
        match self {
            PinProtectedAction::BillEdit | PinProtectedAction::DiscountExceeded => {
                PinSeverity::Medium
            }
            PinProtectedAction::CashMismatch
            | PinProtectedAction::LargeTransaction
            | PinProtectedAction::PriceOverride => PinSeverity::High,
            PinProtectedAction::BillDelete
            | PinProtectedAction::PeriodUnlock
            | PinProtectedAction::RoleChange
            | PinProtectedAction::YearClose
            | PinProtectedAction::GstFiledEdit
            | PinProtectedAction::CalculationOverride => PinSeverity::Critical,
        }
    }

    /// Structurally destructive actions only an owner may authorize. A
    /// correct PIN presented by a lesser role must still be denied.
    pub fn owner_only(self) -> bool {
        match self {
            PinProtectedAction::BillDelete
            | PinProtectedAction::PeriodUnlock
            | PinProtectedAction::RoleChange
            | PinProtectedAction::YearClose
            | PinProtectedAction::GstFiledEdit
            | PinProtectedAction::CalculationOverride => true,
            PinProtectedAction::BillEdit
            | PinProtectedAction::DiscountExceeded
            | PinProtectedAction::CashMismatch
            | PinProtectedAction::LargeTransaction
            | PinProtectedAction::PriceOverride => false,
        }
    }

    /// Conditional actions carry a numeric context and skip the PIN when
    /// the relevant tenant threshold is not crossed.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            PinProtectedAction::DiscountExceeded
                | PinProtectedAction::CashMismatch
                | PinProtectedAction::LargeTransaction
        )
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PinProtectedAction::BillEdit => "Edit locked bill",
            PinProtectedAction::BillDelete => "Delete bill",
            PinProtectedAction::DiscountExceeded => "Discount above limit",
            PinProtectedAction::CashMismatch => "Cash drawer mismatch",
            PinProtectedAction::LargeTransaction => "Transaction above approval limit",
            PinProtectedAction::PriceOverride => "Price override",
            PinProtectedAction::PeriodUnlock => "Reopen accounting period",
            PinProtectedAction::RoleChange => "Change staff role",
            PinProtectedAction::YearClose => "Close financial year",
            PinProtectedAction::GstFiledEdit => "Edit tax-filed document",
            PinProtectedAction::CalculationOverride => "Override calculated totals",
        }
    }
}

impl core::fmt::Display for PinProtectedAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.display_name())
    }
}
