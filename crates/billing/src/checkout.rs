//! Sale finalization: one business event, one atomic unit of work.
//!
//! Each attempt runs against scratch copies of the stock room, the posting
//! engine and the bill; only when every step has succeeded are the copies
//! swapped in. Either the ledger posts and the stock decrements together,
//! or neither happens: a PIN denial or validation failure after allocation
//! discards the allocation entirely, and nothing partial is ever observable.

use chrono::{DateTime, Utc};

use shopledger_accounting::{
    AccountId, EntryDraft, EntryId, JournalLine, JournalPoster, PostingAuthority, SourceType,
    SystemAccounts, VoucherType,
};
use shopledger_core::{Aggregate, DomainError, DomainResult, ExpectedVersion, Money, UserId};
use shopledger_events::EventBus;
use shopledger_inventory::{Allocation, RequestedLine, StockDecrement, StockRoom, allocate};
use shopledger_security::{ActorRole, PinGate, PinProtectedAction, SecurityEvent};

use crate::bill::{Bill, BillCommand, BillLine, FinalizeBill, ReplaceLines};
use crate::guard::{MutationCheck, check_delete, check_edit};
use crate::state::BillState;

/// Credentials the requester supplies when an override might be needed.
#[derive(Debug, Clone)]
pub struct PinCredentials<'a> {
    pub actor: UserId,
    pub role: ActorRole,
    pub pin: Option<&'a str>,
}

/// Which ledger accounts a cash sale posts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleAccounts {
    pub cash: AccountId,
    pub sales: AccountId,
    pub tax_payable: AccountId,
    pub discounts_given: AccountId,
}

impl From<&SystemAccounts> for SaleAccounts {
    fn from(system: &SystemAccounts) -> Self {
        Self {
            cash: system.cash,
            sales: system.sales,
            tax_payable: system.tax_payable,
            discounts_given: system.discounts_given,
        }
    }
}

/// What finalization produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedSale {
    pub entry_id: EntryId,
    pub voucher_number: String,
    pub allocations: Vec<Allocation>,
    /// Total quantity no batch could supply. Non-zero is a degraded
    /// success the caller must surface to the requester, not an error.
    pub shortfall: i64,
}

/// The finalization service.
#[derive(Debug, Clone, Copy)]
pub struct Checkout {
    accounts: SaleAccounts,
    max_conflict_retries: u32,
}

impl Checkout {
    pub fn new(accounts: SaleAccounts) -> Self {
        Self {
            accounts,
            max_conflict_retries: 3,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Finalize a sale: allocate, authorize, decrement and post together.
    ///
    /// Re-finalizing an existing (non-draft) document is an edit: the guard
    /// must allow it (or the PIN gate convert the denial), the previous
    /// allocation returns to stock, and the previous sale entry is reversed
    /// in the same unit of work as the new posting.
    pub fn finalize_sale<B>(
        &self,
        bill: &mut Bill,
        requested: &[RequestedLine],
        stock: &mut StockRoom,
        poster: &mut JournalPoster,
        gate: &PinGate<B>,
        credentials: Option<&PinCredentials<'_>>,
        now: DateTime<Utc>,
    ) -> DomainResult<FinalizedSale>
    where
        B: EventBus<SecurityEvent>,
    {
        self.ensure_same_tenant(bill, stock, poster, gate)?;
        if requested.is_empty() {
            return Err(DomainError::validation("a sale needs at least one line"));
        }

        // Authorization runs before any stock or ledger work is staged, so
        // a denial discards nothing but arithmetic.
        let check = check_edit(bill, gate.settings(), now);
        if !check.allowed {
            self.convert_denial(&check, gate, credentials, now)?;
        }

        let mut attempt = 0;
        loop {
            match self.try_commit(bill, requested, stock, poster, now) {
                Err(DomainError::Conflict(reason)) if attempt < self.max_conflict_retries => {
                    // Another writer moved one of our batches between the
                    // snapshot and the commit. Re-read and retry.
                    attempt += 1;
                    tracing::debug!(
                        attempt,
                        %reason,
                        "batch conflict; retrying with a fresh snapshot"
                    );
                }
                other => return other,
            }
        }
    }

    /// Authorize deleting a bill. Draft bills delete freely; unpaid bills
    /// require an owner PIN; paid/printed/filed bills never delete.
    pub fn authorize_delete<B>(
        &self,
        bill: &Bill,
        gate: &PinGate<B>,
        credentials: Option<&PinCredentials<'_>>,
        now: DateTime<Utc>,
    ) -> DomainResult<()>
    where
        B: EventBus<SecurityEvent>,
    {
        let check = check_delete(bill, gate.settings(), now);
        if check.allowed {
            return Ok(());
        }
        self.convert_denial(&check, gate, credentials, now)
    }

    /// Turn a guard denial into success via the PIN gate, or into the
    /// error the caller propagates. Only the gate converts denials.
    fn convert_denial<B>(
        &self,
        check: &MutationCheck,
        gate: &PinGate<B>,
        credentials: Option<&PinCredentials<'_>>,
        now: DateTime<Utc>,
    ) -> DomainResult<()>
    where
        B: EventBus<SecurityEvent>,
    {
        let action: PinProtectedAction = match (check.pin_can_override, check.override_action) {
            (true, Some(action)) => action,
            _ => return Err(DomainError::immutability(check.reason.clone())),
        };
        let Some(creds) = credentials else {
            return Err(DomainError::immutability(format!(
                "{} (no credentials supplied)",
                check.reason
            )));
        };
        gate.verify(action, creds.pin, creds.actor, creds.role, None, now)
            .require()?;
        Ok(())
    }

    /// One attempt, on scratch copies. Success swaps the copies in; any
    /// error drops them, leaving the live state untouched.
    fn try_commit(
        &self,
        bill: &mut Bill,
        requested: &[RequestedLine],
        stock: &mut StockRoom,
        poster: &mut JournalPoster,
        now: DateTime<Utc>,
    ) -> DomainResult<FinalizedSale> {
        let mut stock_work = stock.clone();
        let mut poster_work = poster.clone();
        let mut bill_work = bill.clone();

        // Editing a billed document: return its previous allocation to
        // stock and reverse its previous entry before re-allocating.
        let previous_entry = latest_unreversed_sale_entry(&poster_work, bill);
        if previous_entry.is_some() {
            for line in bill.lines() {
                if let Some(batch_id) = line.batch_id {
                    stock_work.restock(batch_id, line.quantity)?;
                }
            }
        }

        let mut allocations: Vec<Allocation> = Vec::with_capacity(requested.len());
        let mut decrements: Vec<StockDecrement> = Vec::new();
        let mut bill_lines: Vec<BillLine> = Vec::new();
        let mut gross = Money::ZERO;
        let mut discount_total = Money::ZERO;
        let mut tax_total = Money::ZERO;

        for line in requested {
            let snapshot = stock_work.batches_for(line.product_id);
            let allocation = allocate(line, &snapshot)?;

            for chunk in allocation.chunks() {
                let line_no = (bill_lines.len() as u32) + 1;
                bill_lines.push(BillLine {
                    line_no,
                    product_id: chunk.product_id,
                    quantity: chunk.quantity,
                    unit_price: line.unit_price,
                    discount: chunk.discount,
                    tax: chunk.tax,
                    batch_id: chunk.batch_id,
                });

                let Some(batch_id) = chunk.batch_id else {
                    // The shortfall chunk moves no stock.
                    continue;
                };
                // Manual picks bypass the snapshot; read the batch directly
                // so the decrement still verifies its version.
                let version = snapshot
                    .iter()
                    .find(|b| b.id == batch_id)
                    .map(|b| b.version)
                    .or_else(|| stock_work.get(batch_id).map(|b| b.version))
                    .ok_or(DomainError::NotFound)?;
                decrements.push(StockDecrement {
                    batch_id,
                    quantity: chunk.quantity,
                    expected: ExpectedVersion::Exact(version),
                });
            }

            gross = gross + Money::from_minor(line.quantity * line.unit_price.minor_units());
            discount_total = discount_total + line.discount;
            tax_total = tax_total + line.tax;
            allocations.push(allocation);
        }

        let net = gross - discount_total + tax_total;
        let mut lines = vec![JournalLine::debit(self.accounts.cash, net)];
        if !discount_total.is_zero() {
            lines.push(JournalLine::debit(
                self.accounts.discounts_given,
                discount_total,
            ));
        }
        lines.push(JournalLine::credit(self.accounts.sales, gross));
        if !tax_total.is_zero() {
            lines.push(JournalLine::credit(self.accounts.tax_payable, tax_total));
        }

        let draft = EntryDraft {
            voucher_type: VoucherType::Sale,
            date: now,
            narration: format!("Sale against bill {}", bill.id_typed()),
            source_type: SourceType::Sale,
            source_id: bill.id_typed().0,
            lines,
        };

        if let Some(original_id) = previous_entry {
            poster_work.post_reversal(
                original_id,
                now,
                format!("Reversal on edit of bill {}", bill.id_typed()),
                PostingAuthority::Standard,
            )?;
        }
        let entry = poster_work.post_entry(draft, PostingAuthority::Standard)?;
        let (entry_id, voucher_number) = (entry.id(), entry.voucher_number().to_string());

        stock_work.commit_decrements(&decrements)?;
        self.apply_bill_lines(&mut bill_work, bill_lines, now)?;

        *stock = stock_work;
        *poster = poster_work;
        *bill = bill_work;

        let shortfall = allocations.iter().map(|a| a.shortfall()).sum();
        Ok(FinalizedSale {
            entry_id,
            voucher_number,
            allocations,
            shortfall,
        })
    }

    fn apply_bill_lines(
        &self,
        bill: &mut Bill,
        lines: Vec<BillLine>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let tenant_id = bill
            .tenant_id()
            .ok_or_else(|| DomainError::invariant("bill has no tenant"))?;
        let bill_id = bill.id_typed();

        let mut commands = vec![BillCommand::ReplaceLines(ReplaceLines {
            tenant_id,
            bill_id,
            lines,
            occurred_at: now,
        })];
        if BillState::of(bill) == BillState::Draft {
            commands.push(BillCommand::FinalizeBill(FinalizeBill {
                tenant_id,
                bill_id,
                occurred_at: now,
            }));
        }

        for command in commands {
            let events = bill.handle(&command)?;
            for event in &events {
                bill.apply(event);
            }
        }
        Ok(())
    }

    fn ensure_same_tenant<B>(
        &self,
        bill: &Bill,
        stock: &StockRoom,
        poster: &JournalPoster,
        gate: &PinGate<B>,
    ) -> DomainResult<()>
    where
        B: EventBus<SecurityEvent>,
    {
        let tenant_id = bill
            .tenant_id()
            .ok_or_else(|| DomainError::invariant("bill has no tenant"))?;
        if stock.tenant_id() != tenant_id
            || poster.tenant_id() != tenant_id
            || gate.settings().tenant_id != tenant_id
        {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }
}

/// The bill's most recent sale posting that has not already been reversed.
fn latest_unreversed_sale_entry(poster: &JournalPoster, bill: &Bill) -> Option<EntryId> {
    let source_id = bill.id_typed().0;
    let mut pending: Option<EntryId> = None;
    for entry in poster.entries() {
        if entry.source_id() != source_id {
            continue;
        }
        match entry.source_type() {
            SourceType::Sale => pending = Some(entry.id()),
            SourceType::Reversal => pending = None,
            _ => {}
        }
    }
    pending
}
