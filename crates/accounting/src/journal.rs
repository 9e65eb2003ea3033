//! Journal entries, voucher types and voucher numbering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{AggregateId, DomainError, DomainResult, Money, TenantId};

use crate::accounts::AccountId;

/// Journal entry identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub AggregateId);

impl EntryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for EntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Voucher type: the accounting transaction category.
///
/// Each type has a fixed number prefix and its own per-tenant sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherType {
    Sale,
    Purchase,
    Receipt,
    Payment,
    Journal,
    Contra,
    DebitNote,
    CreditNote,
}

impl VoucherType {
    pub fn prefix(self) -> &'static str {
        match self {
            VoucherType::Sale => "SAL",
            VoucherType::Purchase => "PUR",
            VoucherType::Receipt => "RCP",
            VoucherType::Payment => "PAY",
            VoucherType::Journal => "JRN",
            VoucherType::Contra => "CON",
            VoucherType::DebitNote => "DBN",
            VoucherType::CreditNote => "CRN",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            VoucherType::Sale => "Sales Voucher",
            VoucherType::Purchase => "Purchase Voucher",
            VoucherType::Receipt => "Receipt Voucher",
            VoucherType::Payment => "Payment Voucher",
            VoucherType::Journal => "Journal Voucher",
            VoucherType::Contra => "Contra Voucher",
            VoucherType::DebitNote => "Debit Note",
            VoucherType::CreditNote => "Credit Note",
        }
    }
}

/// What produced a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Sale,
    Purchase,
    Payment,
    Receipt,
    StockAdjustment,
    OpeningBalance,
    Reversal,
    System,
    Manual,
}

/// One side of a journal entry: exactly one of debit/credit is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub account_id: AccountId,
    pub debit: Money,
    pub credit: Money,
}

impl JournalLine {
    pub fn debit(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Money::ZERO,
        }
    }

    pub fn credit(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            debit: Money::ZERO,
            credit: amount,
        }
    }

    /// A line with both sides swapped (used for reversal entries).
    pub fn swapped(self) -> Self {
        Self {
            account_id: self.account_id,
            debit: self.credit,
            credit: self.debit,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.debit.is_negative() || self.credit.is_negative() {
            return Err(DomainError::validation("line amounts cannot be negative"));
        }
        match (self.debit.is_zero(), self.credit.is_zero()) {
            (false, true) | (true, false) => Ok(()),
            _ => Err(DomainError::validation(
                "exactly one of debit/credit must be non-zero",
            )),
        }
    }
}

/// A posted journal entry. Append-only: corrections are new reversal entries,
/// never edits of this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    id: EntryId,
    tenant_id: TenantId,
    voucher_type: VoucherType,
    voucher_number: String,
    date: DateTime<Utc>,
    narration: String,
    source_type: SourceType,
    source_id: AggregateId,
    lines: Vec<JournalLine>,
    total_debit: Money,
    total_credit: Money,
    /// Set by period close; blocks further corrections without an owner unlock.
    locked: bool,
}

impl JournalEntry {
    pub(crate) fn new(
        id: EntryId,
        tenant_id: TenantId,
        voucher_type: VoucherType,
        voucher_number: String,
        date: DateTime<Utc>,
        narration: String,
        source_type: SourceType,
        source_id: AggregateId,
        lines: Vec<JournalLine>,
    ) -> Self {
        let total_debit = lines.iter().map(|l| l.debit).sum();
        let total_credit = lines.iter().map(|l| l.credit).sum();
        Self {
            id,
            tenant_id,
            voucher_type,
            voucher_number,
            date,
            narration,
            source_type,
            source_id,
            lines,
            total_debit,
            total_credit,
            locked: false,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn voucher_type(&self) -> VoucherType {
        self.voucher_type
    }

    pub fn voucher_number(&self) -> &str {
        &self.voucher_number
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn narration(&self) -> &str {
        &self.narration
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn source_id(&self) -> AggregateId {
        self.source_id
    }

    pub fn lines(&self) -> &[JournalLine] {
        &self.lines
    }

    pub fn total_debit(&self) -> Money {
        self.total_debit
    }

    pub fn total_credit(&self) -> Money {
        self.total_credit
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Derived grouping for day-book views. Never feeds balance math.
    pub fn classification(&self) -> crate::classification::EntryClassification {
        crate::classification::classify(self)
    }
}

/// Per-tenant, per-voucher-type monotonic sequences.
///
/// A number is handed out only once; the posting engine requests it only
/// after an entry has fully validated, so failed posts neither gap nor
/// repeat the sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherSequences {
    counters: HashMap<VoucherType, u64>,
}

impl VoucherSequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next voucher number for the given type.
    pub fn next(&mut self, voucher_type: VoucherType) -> String {
        let counter = self.counters.entry(voucher_type).or_insert(0);
        *counter += 1;
        format!("{}-{:05}", voucher_type.prefix(), counter)
    }

    /// Count of numbers already allocated for the given type.
    pub fn allocated(&self, voucher_type: VoucherType) -> u64 {
        self.counters.get(&voucher_type).copied().unwrap_or(0)
    }
}
