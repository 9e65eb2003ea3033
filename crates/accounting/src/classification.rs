//! Derived entry classification for day-book grouping.

use serde::{Deserialize, Serialize};

use crate::journal::{JournalEntry, SourceType, VoucherType};

/// Read-only grouping attached to a posted entry for downstream views.
///
/// Derived from source type, voucher type and narration keywords. It is a
/// convenience, not a key: consumers must tolerate derivation changes, and
/// it never influences balance math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryClassification {
    Sale,
    Purchase,
    Expense,
    Payment,
    Receipt,
    Adjustment,
    Depreciation,
    Contra,
    OpeningBalance,
    System,
}

impl EntryClassification {
    pub fn display_name(self) -> &'static str {
        match self {
            EntryClassification::Sale => "Sale",
            EntryClassification::Purchase => "Purchase",
            EntryClassification::Expense => "Expense",
            EntryClassification::Payment => "Payment",
            EntryClassification::Receipt => "Receipt",
            EntryClassification::Adjustment => "Adjustment",
            EntryClassification::Depreciation => "Depreciation",
            EntryClassification::Contra => "Contra",
            EntryClassification::OpeningBalance => "Opening Balance",
            EntryClassification::System => "System",
        }
    }
}

/// Classify a posted entry. Narration keywords win over the source type,
/// which wins over the voucher type.
pub fn classify(entry: &JournalEntry) -> EntryClassification {
    let narration = entry.narration().to_lowercase();
    if narration.contains("depreciation") {
        return EntryClassification::Depreciation;
    }
    if narration.contains("opening balance") {
        return EntryClassification::OpeningBalance;
    }

    match entry.source_type() {
        SourceType::Sale => EntryClassification::Sale,
        SourceType::Purchase => EntryClassification::Purchase,
        SourceType::Payment => EntryClassification::Payment,
        SourceType::Receipt => EntryClassification::Receipt,
        SourceType::StockAdjustment | SourceType::Reversal => EntryClassification::Adjustment,
        SourceType::OpeningBalance => EntryClassification::OpeningBalance,
        SourceType::System => EntryClassification::System,
        SourceType::Manual => match entry.voucher_type() {
            VoucherType::Sale => EntryClassification::Sale,
            VoucherType::Purchase => EntryClassification::Purchase,
            VoucherType::Receipt => EntryClassification::Receipt,
            VoucherType::Payment => EntryClassification::Payment,
            VoucherType::Contra => EntryClassification::Contra,
            VoucherType::DebitNote | VoucherType::CreditNote => EntryClassification::Adjustment,
            VoucherType::Journal => EntryClassification::Expense,
        },
    }
}
