//! Account balances as a fold over posted immutable lines.
//!
//! There is deliberately no mutable running-balance field on a ledger
//! account: two concurrent postings against the same account would race on
//! such a counter. Folding over the append-only entry list removes the race
//! by construction; a cached read model must be rebuilt from this same fold.

use std::collections::HashMap;

use shopledger_core::Money;

use crate::accounts::{AccountId, BalanceSide, ChartOfAccounts};
use crate::journal::JournalEntry;

/// Read model: current balance per account, signed relative to each
/// account's normal side (a positive cash balance, a positive sales balance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalances {
    balances: HashMap<AccountId, Money>,
}

impl AccountBalances {
    /// Fold opening balances plus every posted line into per-account totals.
    pub fn fold<'a>(
        chart: &ChartOfAccounts,
        entries: impl IntoIterator<Item = &'a JournalEntry>,
    ) -> Self {
        let mut balances: HashMap<AccountId, Money> = chart
            .accounts()
            .map(|account| (account.id, account.signed_opening()))
            .collect();

        for entry in entries {
            for line in entry.lines() {
                let Some(account) = chart.get(line.account_id) else {
                    // A posted line always references a chart account; a
                    // removed account's history is simply not re-aggregated.
                    continue;
                };
                let delta = match account.normal_side() {
                    BalanceSide::Debit => line.debit - line.credit,
                    BalanceSide::Credit => line.credit - line.debit,
                };
                let slot = balances.entry(line.account_id).or_insert(Money::ZERO);
                *slot = *slot + delta;
            }
        }

        Self { balances }
    }

    pub fn balance(&self, account_id: AccountId) -> Option<Money> {
        self.balances.get(&account_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AccountId, Money)> + '_ {
        self.balances.iter().map(|(id, money)| (*id, *money))
    }
}
