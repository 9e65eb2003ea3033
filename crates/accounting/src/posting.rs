//! Journal posting engine.
//!
//! `post_entry` validates a draft completely before touching any state: an
//! unbalanced draft, an unknown account or a locked period fail the call
//! with the ledger book untouched, and the voucher sequence is only
//! advanced after validation passes, so failed or retried posts can
//! neither gap nor repeat a number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use shopledger_core::{AggregateId, DomainError, DomainResult, Money, TenantId};

use crate::accounts::{AccountId, ChartOfAccounts, LedgerAccount};
use crate::balances::AccountBalances;
use crate::journal::{EntryId, JournalEntry, JournalLine, SourceType, VoucherSequences, VoucherType};
use crate::periods::{AccountingPeriod, PeriodCalendar};

/// Who is asking: a standard caller, or one carrying an owner-level unlock
/// minted by the PIN gate. Only `OwnerOverride` may post into a locked
/// period or reverse a locked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostingAuthority {
    Standard,
    OwnerOverride,
}

/// An entry waiting to be posted. Voucher number and totals are assigned by
/// the engine, not the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub voucher_type: VoucherType,
    pub date: DateTime<Utc>,
    pub narration: String,
    pub source_type: SourceType,
    pub source_id: AggregateId,
    pub lines: Vec<JournalLine>,
}

/// Per-tenant posting engine over the chart of accounts, the period
/// calendar and the append-only entry list.
#[derive(Debug, Clone)]
pub struct JournalPoster {
    tenant_id: TenantId,
    chart: ChartOfAccounts,
    periods: PeriodCalendar,
    sequences: VoucherSequences,
    entries: Vec<JournalEntry>,
    by_id: HashMap<EntryId, usize>,
}

impl JournalPoster {
    pub fn new(chart: ChartOfAccounts, periods: PeriodCalendar) -> Self {
        Self {
            tenant_id: chart.tenant_id(),
            chart,
            periods,
            sequences: VoucherSequences::new(),
            entries: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn chart(&self) -> &ChartOfAccounts {
        &self.chart
    }

    pub fn periods(&self) -> &PeriodCalendar {
        &self.periods
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> Option<&JournalEntry> {
        self.by_id.get(&id).and_then(|idx| self.entries.get(*idx))
    }

    /// Validate a draft against the full posting contract without mutating
    /// anything. `post_entry` calls this first; the checkout layer calls it
    /// directly to stage a post before committing stock movements.
    pub fn validate(&self, draft: &EntryDraft, authority: PostingAuthority) -> DomainResult<()> {
        if draft.lines.len() < 2 {
            return Err(DomainError::validation(
                "journal entry needs at least two lines",
            ));
        }

        let mut debit_total: i128 = 0;
        let mut credit_total: i128 = 0;
        for line in &draft.lines {
            line.validate()?;
            debit_total += line.debit.minor_units() as i128;
            credit_total += line.credit.minor_units() as i128;
        }

        if debit_total != credit_total {
            return Err(DomainError::UnbalancedEntry {
                debits: debit_total as i64,
                credits: credit_total as i64,
            });
        }

        for line in &draft.lines {
            self.chart.ensure_exists(line.account_id)?;
        }

        if self.periods.is_locked(draft.date) && authority == PostingAuthority::Standard {
            return Err(DomainError::locked_period(format!(
                "entry date {} falls inside a closed period",
                draft.date.date_naive()
            )));
        }

        Ok(())
    }

    /// Post a balanced entry. On failure nothing is observable: no entry,
    /// no balance movement, no consumed voucher number.
    pub fn post_entry(
        &mut self,
        draft: EntryDraft,
        authority: PostingAuthority,
    ) -> DomainResult<&JournalEntry> {
        self.validate(&draft, authority)?;

        let voucher_number = self.sequences.next(draft.voucher_type);
        let entry = JournalEntry::new(
            EntryId::new(AggregateId::new()),
            self.tenant_id,
            draft.voucher_type,
            voucher_number,
            draft.date,
            draft.narration,
            draft.source_type,
            draft.source_id,
            draft.lines,
        );

        let idx = self.entries.len();
        self.by_id.insert(entry.id(), idx);
        self.entries.push(entry);
        Ok(&self.entries[idx])
    }

    /// Post a correction: a new entry with every line's debit/credit swapped,
    /// referencing the original source id. The original entry is never
    /// touched. A locked original (period close) refuses corrections unless
    /// the caller holds an owner unlock.
    pub fn post_reversal(
        &mut self,
        original_id: EntryId,
        date: DateTime<Utc>,
        narration: String,
        authority: PostingAuthority,
    ) -> DomainResult<&JournalEntry> {
        let original = self.entry(original_id).ok_or(DomainError::NotFound)?;
        if original.locked() && authority == PostingAuthority::Standard {
            return Err(DomainError::immutability(format!(
                "entry {} is locked by period close; owner unlock required",
                original.voucher_number()
            )));
        }

        let draft = EntryDraft {
            voucher_type: original.voucher_type(),
            date,
            narration,
            source_type: SourceType::Reversal,
            source_id: original.source_id(),
            lines: original.lines().iter().map(|l| l.swapped()).collect(),
        };

        self.post_entry(draft, authority)
    }

    /// Close the period containing `date`: the period locks and every entry
    /// already posted inside it gets its locked flag set.
    pub fn close_period(&mut self, date: DateTime<Utc>) -> DomainResult<AccountingPeriod> {
        let period = self.periods.lock_containing(date)?;
        for entry in &mut self.entries {
            if period.contains(entry.date()) {
                entry.set_locked(true);
            }
        }
        Ok(period)
    }

    /// Reopen a closed period. Owner-level: callers obtain `OwnerOverride`
    /// through the PIN gate.
    pub fn unlock_period(
        &mut self,
        date: DateTime<Utc>,
        authority: PostingAuthority,
    ) -> DomainResult<AccountingPeriod> {
        if authority != PostingAuthority::OwnerOverride {
            return Err(DomainError::denied(
                "period unlock is an owner-level operation",
            ));
        }
        let period = self.periods.unlock_containing(date)?;
        for entry in &mut self.entries {
            if period.contains(entry.date()) {
                entry.set_locked(false);
            }
        }
        Ok(period)
    }

    pub fn create_account(&mut self, account: LedgerAccount) -> DomainResult<()> {
        self.chart.create(account)
    }

    /// Remove a non-system account that has no postings against it.
    pub fn remove_account(&mut self, id: AccountId) -> DomainResult<()> {
        let referenced = self
            .entries
            .iter()
            .flat_map(|e| e.lines())
            .any(|l| l.account_id == id);
        if referenced {
            return Err(DomainError::invariant(
                "account has postings and cannot be removed",
            ));
        }
        self.chart.remove(id).map(|_| ())
    }

    /// Current balances: the fold over opening balances and posted lines.
    pub fn balances(&self) -> AccountBalances {
        AccountBalances::fold(&self.chart, &self.entries)
    }

    pub fn balance(&self, account_id: AccountId) -> DomainResult<Money> {
        self.chart.ensure_exists(account_id)?;
        Ok(self
            .balances()
            .balance(account_id)
            .unwrap_or(Money::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    use crate::accounts::SystemAccounts;

    fn poster() -> (JournalPoster, SystemAccounts) {
        let (chart, system) = ChartOfAccounts::bootstrap(TenantId::new());
        (JournalPoster::new(chart, PeriodCalendar::new()), system)
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn sale_draft(system: &SystemAccounts, amount: i64, at: DateTime<Utc>) -> EntryDraft {
        EntryDraft {
            voucher_type: VoucherType::Sale,
            date: at,
            narration: "counter sale".to_string(),
            source_type: SourceType::Sale,
            source_id: AggregateId::new(),
            lines: vec![
                JournalLine::debit(system.cash, Money::from_minor(amount)),
                JournalLine::credit(system.sales, Money::from_minor(amount)),
            ],
        }
    }

    #[test]
    fn balanced_entry_posts_and_moves_balances() {
        let (mut poster, system) = poster();
        let entry = poster
            .post_entry(sale_draft(&system, 1_000, date(2025, 4, 2)), PostingAuthority::Standard)
            .unwrap();
        assert_eq!(entry.voucher_number(), "SAL-00001");
        assert_eq!(entry.total_debit(), entry.total_credit());

        assert_eq!(poster.balance(system.cash).unwrap(), Money::from_minor(1_000));
        assert_eq!(poster.balance(system.sales).unwrap(), Money::from_minor(1_000));
    }

    #[test]
    fn unbalanced_entry_fails_with_no_side_effect() {
        let (mut poster, system) = poster();
        let draft = EntryDraft {
            lines: vec![
                JournalLine::debit(system.cash, Money::from_minor(1_000)),
                JournalLine::credit(system.sales, Money::from_minor(990)),
            ],
            ..sale_draft(&system, 0, date(2025, 4, 2))
        };

        let err = poster
            .post_entry(draft, PostingAuthority::Standard)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::UnbalancedEntry {
                debits: 1_000,
                credits: 990
            }
        );
        assert!(poster.entries().is_empty());
        assert_eq!(poster.balance(system.cash).unwrap(), Money::ZERO);
    }

    #[test]
    fn single_line_entry_is_rejected() {
        let (mut poster, system) = poster();
        let draft = EntryDraft {
            lines: vec![JournalLine::debit(system.cash, Money::from_minor(100))],
            ..sale_draft(&system, 0, date(2025, 4, 2))
        };
        let err = poster
            .post_entry(draft, PostingAuthority::Standard)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unknown_account_is_rejected() {
        let (mut poster, system) = poster();
        let stranger = AccountId::new(AggregateId::new());
        let draft = EntryDraft {
            lines: vec![
                JournalLine::debit(stranger, Money::from_minor(100)),
                JournalLine::credit(system.sales, Money::from_minor(100)),
            ],
            ..sale_draft(&system, 0, date(2025, 4, 2))
        };
        let err = poster
            .post_entry(draft, PostingAuthority::Standard)
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownLedger(_)));
    }

    #[test]
    fn failed_posts_never_gap_the_voucher_sequence() {
        let (mut poster, system) = poster();

        poster
            .post_entry(sale_draft(&system, 100, date(2025, 4, 2)), PostingAuthority::Standard)
            .unwrap();

        // An unbalanced attempt in between must not consume a number.
        let bad = EntryDraft {
            lines: vec![
                JournalLine::debit(system.cash, Money::from_minor(5)),
                JournalLine::credit(system.sales, Money::from_minor(6)),
            ],
            ..sale_draft(&system, 0, date(2025, 4, 2))
        };
        assert!(poster.post_entry(bad, PostingAuthority::Standard).is_err());

        let entry = poster
            .post_entry(sale_draft(&system, 100, date(2025, 4, 3)), PostingAuthority::Standard)
            .unwrap();
        assert_eq!(entry.voucher_number(), "SAL-00002");
    }

    #[test]
    fn locked_period_rejects_standard_but_not_owner_override() {
        let (chart, system) = ChartOfAccounts::bootstrap(TenantId::new());
        let mut periods = PeriodCalendar::new();
        periods
            .add_period(date(2025, 4, 1), date(2025, 5, 1))
            .unwrap();
        let mut poster = JournalPoster::new(chart, periods);
        poster.close_period(date(2025, 4, 10)).unwrap();

        let err = poster
            .post_entry(sale_draft(&system, 100, date(2025, 4, 15)), PostingAuthority::Standard)
            .unwrap_err();
        assert!(matches!(err, DomainError::LockedPeriod(_)));

        poster
            .post_entry(
                sale_draft(&system, 100, date(2025, 4, 15)),
                PostingAuthority::OwnerOverride,
            )
            .unwrap();
    }

    #[test]
    fn reversal_swaps_sides_and_references_original_source() {
        let (mut poster, system) = poster();
        let source_id = AggregateId::new();
        let draft = EntryDraft {
            source_id,
            ..sale_draft(&system, 400, date(2025, 4, 2))
        };
        let original_id = poster
            .post_entry(draft, PostingAuthority::Standard)
            .unwrap()
            .id();

        let reversal = poster
            .post_reversal(
                original_id,
                date(2025, 4, 3),
                "refund".to_string(),
                PostingAuthority::Standard,
            )
            .unwrap();
        assert_eq!(reversal.source_type(), SourceType::Reversal);
        assert_eq!(reversal.source_id(), source_id);
        assert_eq!(reversal.lines()[0].credit, Money::from_minor(400));

        assert_eq!(poster.balance(system.cash).unwrap(), Money::ZERO);
        assert_eq!(poster.balance(system.sales).unwrap(), Money::ZERO);
    }

    #[test]
    fn locked_entry_blocks_reversal_without_owner_unlock() {
        let (chart, system) = ChartOfAccounts::bootstrap(TenantId::new());
        let mut periods = PeriodCalendar::new();
        periods
            .add_period(date(2025, 4, 1), date(2025, 5, 1))
            .unwrap();
        let mut poster = JournalPoster::new(chart, periods);

        let original_id = poster
            .post_entry(sale_draft(&system, 300, date(2025, 4, 5)), PostingAuthority::Standard)
            .unwrap()
            .id();
        poster.close_period(date(2025, 4, 5)).unwrap();

        let err = poster
            .post_reversal(
                original_id,
                date(2025, 5, 2),
                "late refund".to_string(),
                PostingAuthority::Standard,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::ImmutabilityViolation(_)));

        poster
            .post_reversal(
                original_id,
                date(2025, 5, 2),
                "late refund".to_string(),
                PostingAuthority::OwnerOverride,
            )
            .unwrap();
    }

    #[test]
    fn unlock_period_requires_owner_override() {
        let (chart, _) = ChartOfAccounts::bootstrap(TenantId::new());
        let mut periods = PeriodCalendar::new();
        periods
            .add_period(date(2025, 4, 1), date(2025, 5, 1))
            .unwrap();
        let mut poster = JournalPoster::new(chart, periods);
        poster.close_period(date(2025, 4, 10)).unwrap();

        let err = poster
            .unlock_period(date(2025, 4, 10), PostingAuthority::Standard)
            .unwrap_err();
        assert!(matches!(err, DomainError::AuthorizationDenied(_)));

        poster
            .unlock_period(date(2025, 4, 10), PostingAuthority::OwnerOverride)
            .unwrap();
        assert!(!poster.periods().is_locked(date(2025, 4, 10)));
    }

    #[test]
    fn account_with_postings_cannot_be_removed() {
        let (mut poster, system) = poster();
        let extra = LedgerAccount {
            id: AccountId::new(AggregateId::new()),
            tenant_id: poster.tenant_id(),
            code: "6000".to_string(),
            name: "Delivery Charges".to_string(),
            group: crate::accounts::AccountGroup::Income,
            account_type: crate::accounts::AccountType::Other,
            opening_balance: Money::ZERO,
            opening_side: crate::accounts::BalanceSide::Credit,
            system_account: false,
            external_ref: None,
        };
        let extra_id = extra.id;
        poster.create_account(extra).unwrap();

        let draft = EntryDraft {
            voucher_type: VoucherType::Sale,
            date: date(2025, 4, 2),
            narration: "delivery".to_string(),
            source_type: SourceType::Sale,
            source_id: AggregateId::new(),
            lines: vec![
                JournalLine::debit(system.cash, Money::from_minor(50)),
                JournalLine::credit(extra_id, Money::from_minor(50)),
            ],
        };
        poster.post_entry(draft, PostingAuthority::Standard).unwrap();

        let err = poster.remove_account(extra_id).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every sequence of balanced posts leaves total debits
        /// equal to total credits across the whole book.
        #[test]
        fn posted_book_always_balances(
            amounts in prop::collection::vec(1i64..1_000_000i64, 1..12)
        ) {
            let (mut poster, system) = poster();

            for amount in &amounts {
                poster
                    .post_entry(sale_draft(&system, *amount, date(2025, 4, 2)), PostingAuthority::Standard)
                    .unwrap();
            }

            let mut debits: i128 = 0;
            let mut credits: i128 = 0;
            for entry in poster.entries() {
                debits += entry.total_debit().minor_units() as i128;
                credits += entry.total_credit().minor_units() as i128;
            }
            prop_assert_eq!(debits, credits);

            // Voucher numbers: dense, gap-free, in posting order.
            for (i, entry) in poster.entries().iter().enumerate() {
                let expected = format!("SAL-{:05}", i + 1);
                prop_assert_eq!(entry.voucher_number(), expected.as_str());
            }
        }
    }
}
