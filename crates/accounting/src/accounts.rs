//! Chart of accounts: the per-tenant ledger account registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use shopledger_core::{AggregateId, DomainError, DomainResult, Entity, Money, TenantId};

/// Ledger account identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub AggregateId);

impl AccountId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Which side of an entry increases an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSide {
    Debit,
    Credit,
}

impl BalanceSide {
    pub fn opposite(self) -> BalanceSide {
        match self {
            BalanceSide::Debit => BalanceSide::Credit,
            BalanceSide::Credit => BalanceSide::Debit,
        }
    }
}

/// High-level account group (determines the normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountGroup {
    Assets,
    Liabilities,
    Income,
    Expenses,
    Equity,
}

impl AccountGroup {
    /// Assets and expenses grow on the debit side; the rest on the credit side.
    pub fn normal_side(self) -> BalanceSide {
        match self {
            AccountGroup::Assets | AccountGroup::Expenses => BalanceSide::Debit,
            AccountGroup::Liabilities | AccountGroup::Income | AccountGroup::Equity => {
                BalanceSide::Credit
            }
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AccountGroup::Assets => "Assets",
            AccountGroup::Liabilities => "Liabilities",
            AccountGroup::Income => "Income",
            AccountGroup::Expenses => "Expenses",
            AccountGroup::Equity => "Equity",
        }
    }
}

/// Finer account classification within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Cash,
    Bank,
    Receivable,
    Payable,
    SalesRevenue,
    PurchaseExpense,
    TaxPayable,
    DiscountGiven,
    StockAsset,
    Capital,
    OperatingExpense,
    Other,
}

impl AccountType {
    pub fn display_name(self) -> &'static str {
        match self {
            AccountType::Cash => "Cash",
            AccountType::Bank => "Bank",
            AccountType::Receivable => "Accounts Receivable",
            AccountType::Payable => "Accounts Payable",
            AccountType::SalesRevenue => "Sales Revenue",
            AccountType::PurchaseExpense => "Purchases",
            AccountType::TaxPayable => "Tax Payable",
            AccountType::DiscountGiven => "Discounts Given",
            AccountType::StockAsset => "Stock in Hand",
            AccountType::Capital => "Capital",
            AccountType::OperatingExpense => "Operating Expense",
            AccountType::Other => "Other",
        }
    }
}

/// Optional link from a ledger account to an external entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalRef {
    Customer(AggregateId),
    Vendor(AggregateId),
    Bank(AggregateId),
}

/// A ledger account: a named bucket accumulating debits/credits.
///
/// Created once (at onboarding for system accounts, on demand otherwise) and
/// mutated only via posted entries. The struct itself carries no running
/// balance; see `AccountBalances` for the fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: AccountId,
    pub tenant_id: TenantId,
    /// Short ledger code, e.g. "1000".
    pub code: String,
    pub name: String,
    pub group: AccountGroup,
    pub account_type: AccountType,
    pub opening_balance: Money,
    pub opening_side: BalanceSide,
    /// System accounts are seeded at onboarding and cannot be removed.
    pub system_account: bool,
    pub external_ref: Option<ExternalRef>,
}

impl LedgerAccount {
    pub fn normal_side(&self) -> BalanceSide {
        self.group.normal_side()
    }

    /// Opening balance signed relative to the account's normal side.
    pub fn signed_opening(&self) -> Money {
        if self.opening_side == self.normal_side() {
            self.opening_balance
        } else {
            -self.opening_balance
        }
    }
}

impl Entity for LedgerAccount {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Well-known system account ids seeded at tenant onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemAccounts {
    pub cash: AccountId,
    pub bank: AccountId,
    pub sales: AccountId,
    pub purchases: AccountId,
    pub tax_payable: AccountId,
    pub discounts_given: AccountId,
    pub stock: AccountId,
    pub capital: AccountId,
}

/// Per-tenant chart of accounts: pure lookup/state holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOfAccounts {
    tenant_id: TenantId,
    accounts: HashMap<AccountId, LedgerAccount>,
}

impl ChartOfAccounts {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            accounts: HashMap::new(),
        }
    }

    /// Create a chart pre-seeded with the system accounts every tenant gets
    /// at onboarding.
    pub fn bootstrap(tenant_id: TenantId) -> (Self, SystemAccounts) {
        let mut chart = Self::new(tenant_id);

        let seed = [
            ("1000", "Cash", AccountGroup::Assets, AccountType::Cash),
            ("1100", "Bank", AccountGroup::Assets, AccountType::Bank),
            ("1200", "Stock in Hand", AccountGroup::Assets, AccountType::StockAsset),
            ("4000", "Sales", AccountGroup::Income, AccountType::SalesRevenue),
            ("5000", "Purchases", AccountGroup::Expenses, AccountType::PurchaseExpense),
            ("2100", "Tax Payable", AccountGroup::Liabilities, AccountType::TaxPayable),
            ("5100", "Discounts Given", AccountGroup::Expenses, AccountType::DiscountGiven),
            ("3000", "Capital", AccountGroup::Equity, AccountType::Capital),
        ];

        let mut ids = [AccountId::new(AggregateId::new()); 8];
        for (slot, (code, name, group, account_type)) in ids.iter_mut().zip(seed) {
            let id = AccountId::new(AggregateId::new());
            let account = LedgerAccount {
                id,
                tenant_id,
                code: code.to_string(),
                name: name.to_string(),
                group,
                account_type,
                opening_balance: Money::ZERO,
                opening_side: group.normal_side(),
                system_account: true,
                external_ref: None,
            };
            // Seeded accounts are unique by construction.
            chart.accounts.insert(id, account);
            *slot = id;
        }

        let system = SystemAccounts {
            cash: ids[0],
            bank: ids[1],
            stock: ids[2],
            sales: ids[3],
            purchases: ids[4],
            tax_payable: ids[5],
            discounts_given: ids[6],
            capital: ids[7],
        };

        (chart, system)
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn create(&mut self, account: LedgerAccount) -> DomainResult<()> {
        if account.tenant_id != self.tenant_id {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if account.name.trim().is_empty() {
            return Err(DomainError::validation("account name cannot be empty"));
        }
        if account.opening_balance.is_negative() {
            return Err(DomainError::validation(
                "opening balance cannot be negative; use the opposite side",
            ));
        }
        if self.accounts.contains_key(&account.id) {
            return Err(DomainError::conflict("account already exists"));
        }
        if self.accounts.values().any(|a| a.code == account.code) {
            return Err(DomainError::conflict(format!(
                "account code '{}' already in use",
                account.code
            )));
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    pub fn get(&self, id: AccountId) -> Option<&LedgerAccount> {
        self.accounts.get(&id)
    }

    pub fn ensure_exists(&self, id: AccountId) -> DomainResult<&LedgerAccount> {
        self.accounts
            .get(&id)
            .ok_or_else(|| DomainError::unknown_ledger(format!("account {id} not in chart")))
    }

    /// Remove a non-system account. The posting engine is responsible for
    /// refusing removal of accounts that have postings.
    pub fn remove(&mut self, id: AccountId) -> DomainResult<LedgerAccount> {
        let account = self.accounts.get(&id).ok_or(DomainError::NotFound)?;
        if account.system_account {
            return Err(DomainError::invariant(
                "system accounts cannot be removed",
            ));
        }
        self.accounts.remove(&id).ok_or(DomainError::NotFound)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &LedgerAccount> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
