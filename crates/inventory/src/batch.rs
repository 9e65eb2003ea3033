//! Physical stock batches with expiry dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shopledger_core::{AggregateId, AggregateRoot, Money, TenantId};

/// Product identifier (tenant-scoped via `tenant_id` fields on batches).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Batch identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub AggregateId);

impl BatchId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Batch lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Active,
    Expired,
    Depleted,
    Blocked,
}

/// One physical batch of a product: what was bought together, expiring
/// together, priced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductBatch {
    pub id: BatchId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_number: String,
    pub expiry: NaiveDate,
    pub remaining_stock: i64,
    pub purchase_price: Money,
    pub sale_price: Money,
    pub mrp: Money,
    pub status: BatchStatus,
    /// Bumped on every stock movement; used for optimistic-concurrency
    /// checks when a computed allocation is committed.
    pub version: u64,
}

impl ProductBatch {
    /// Whether the batch can supply an allocation right now.
    pub fn is_available(&self) -> bool {
        self.status == BatchStatus::Active && self.remaining_stock > 0
    }
}

impl AggregateRoot for ProductBatch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
