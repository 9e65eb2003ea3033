//! Accounting module (double-entry ledger).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.
//! Entries are append-only once posted; account balances are a fold over
//! posted immutable lines, never a mutable counter.

pub mod accounts;
pub mod balances;
pub mod classification;
pub mod journal;
pub mod periods;
pub mod posting;

pub use accounts::{
    AccountGroup, AccountId, AccountType, BalanceSide, ChartOfAccounts, ExternalRef,
    LedgerAccount, SystemAccounts,
};
pub use balances::AccountBalances;
pub use classification::{EntryClassification, classify};
pub use journal::{
    EntryId, JournalEntry, JournalLine, SourceType, VoucherSequences, VoucherType,
};
pub use periods::{AccountingPeriod, PeriodCalendar};
pub use posting::{EntryDraft, JournalPoster, PostingAuthority};
