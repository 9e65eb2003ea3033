//! Per-tenant batch store with an expiry-ordered index.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use shopledger_core::{DomainError, DomainResult, ExpectedVersion, TenantId};

use crate::batch::{BatchId, BatchStatus, ProductBatch, ProductId};

/// One staged stock movement: decrement `quantity` from `batch_id`,
/// provided the batch is still at the version the allocation was computed
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub batch_id: BatchId,
    pub quantity: i64,
    pub expected: ExpectedVersion,
}

/// Batch registry for one tenant.
///
/// The index key is (expiry, insertion sequence), so iteration yields
/// batches in expiry order with ties broken by creation order, exactly
/// the walk order the allocation engine requires.
#[derive(Debug, Clone)]
pub struct StockRoom {
    tenant_id: TenantId,
    batches: HashMap<BatchId, ProductBatch>,
    fefo_index: HashMap<ProductId, BTreeMap<(NaiveDate, u64), BatchId>>,
    next_seq: u64,
}

impl StockRoom {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            batches: HashMap::new(),
            fefo_index: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn add_batch(&mut self, batch: ProductBatch) -> DomainResult<()> {
        if batch.tenant_id != self.tenant_id {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if batch.batch_number.trim().is_empty() {
            return Err(DomainError::validation("batch number cannot be empty"));
        }
        if batch.remaining_stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if self.batches.contains_key(&batch.id) {
            return Err(DomainError::conflict("batch already exists"));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.fefo_index
            .entry(batch.product_id)
            .or_default()
            .insert((batch.expiry, seq), batch.id);
        self.batches.insert(batch.id, batch);
        Ok(())
    }

    pub fn get(&self, id: BatchId) -> Option<&ProductBatch> {
        self.batches.get(&id)
    }

    /// Snapshot of a product's available batches in FEFO order.
    ///
    /// The snapshot carries each batch's version; committing against it
    /// later will detect any interleaved movement.
    pub fn batches_for(&self, product_id: ProductId) -> Vec<ProductBatch> {
        let Some(index) = self.fefo_index.get(&product_id) else {
            return Vec::new();
        };
        index
            .values()
            .filter_map(|id| self.batches.get(id))
            .filter(|batch| batch.is_available())
            .cloned()
            .collect()
    }

    /// Mark batches past `today` as expired so they stop supplying
    /// allocations.
    pub fn retire_expired(&mut self, today: NaiveDate) {
        for batch in self.batches.values_mut() {
            if batch.status == BatchStatus::Active && batch.expiry < today {
                batch.status = BatchStatus::Expired;
                batch.version += 1;
            }
        }
    }

    /// Apply one stock movement under an optimistic version check.
    pub fn decrement(
        &mut self,
        batch_id: BatchId,
        quantity: i64,
        expected: ExpectedVersion,
    ) -> DomainResult<()> {
        self.commit_decrements(&[StockDecrement {
            batch_id,
            quantity,
            expected,
        }])
    }

    /// Return previously allocated units to a batch (a voided or edited
    /// sale). A depleted batch becomes active again.
    pub fn restock(&mut self, batch_id: BatchId, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation("restock must be positive"));
        }
        let batch = self
            .batches
            .get_mut(&batch_id)
            .ok_or(DomainError::NotFound)?;
        batch.remaining_stock += quantity;
        batch.version += 1;
        if batch.status == BatchStatus::Depleted {
            batch.status = BatchStatus::Active;
        }
        Ok(())
    }

    /// Apply a set of staged movements atomically: every check runs before
    /// any batch is touched, so a conflict leaves the room unchanged and
    /// the caller can re-read and retry.
    pub fn commit_decrements(&mut self, decrements: &[StockDecrement]) -> DomainResult<()> {
        for staged in decrements {
            let batch = self
                .batches
                .get(&staged.batch_id)
                .ok_or(DomainError::NotFound)?;
            if staged.quantity <= 0 {
                return Err(DomainError::validation("decrement must be positive"));
            }
            staged.expected.check(batch.version)?;
            if staged.quantity > batch.remaining_stock {
                return Err(DomainError::invariant("stock cannot go negative"));
            }
        }

        for staged in decrements {
            if let Some(batch) = self.batches.get_mut(&staged.batch_id) {
                batch.remaining_stock -= staged.quantity;
                batch.version += 1;
                if batch.remaining_stock == 0 {
                    batch.status = BatchStatus::Depleted;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopledger_core::{AggregateId, Money};

    fn test_batch(
        tenant_id: TenantId,
        product_id: ProductId,
        expiry: NaiveDate,
        remaining: i64,
    ) -> ProductBatch {
        ProductBatch {
            id: BatchId::new(AggregateId::new()),
            tenant_id,
            product_id,
            batch_number: format!("B-{expiry}"),
            expiry,
            remaining_stock: remaining,
            purchase_price: Money::from_minor(700),
            sale_price: Money::from_minor(1_000),
            mrp: Money::from_minor(1_200),
            status: BatchStatus::Active,
            version: 0,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn batches_come_back_in_expiry_order_with_creation_tiebreak() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let mut room = StockRoom::new(tenant_id);

        let late = test_batch(tenant_id, product_id, date(2026, 6, 1), 5);
        let early_first = test_batch(tenant_id, product_id, date(2026, 3, 1), 5);
        let early_second = test_batch(tenant_id, product_id, date(2026, 3, 1), 5);

        room.add_batch(late.clone()).unwrap();
        room.add_batch(early_first.clone()).unwrap();
        room.add_batch(early_second.clone()).unwrap();

        let snapshot = room.batches_for(product_id);
        let ids: Vec<BatchId> = snapshot.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![early_first.id, early_second.id, late.id]);
    }

    #[test]
    fn decrement_checks_version_and_stock() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let mut room = StockRoom::new(tenant_id);
        let batch = test_batch(tenant_id, product_id, date(2026, 3, 1), 10);
        let id = batch.id;
        room.add_batch(batch).unwrap();

        room.decrement(id, 4, ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(room.get(id).unwrap().remaining_stock, 6);

        // Stale version is a conflict.
        let err = room.decrement(id, 1, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Overdraw never goes negative.
        let err = room.decrement(id, 7, ExpectedVersion::Exact(1)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let mut room = StockRoom::new(tenant_id);
        let a = test_batch(tenant_id, product_id, date(2026, 3, 1), 10);
        let b = test_batch(tenant_id, product_id, date(2026, 4, 1), 10);
        let (a_id, b_id) = (a.id, b.id);
        room.add_batch(a).unwrap();
        room.add_batch(b).unwrap();

        let staged = [
            StockDecrement {
                batch_id: a_id,
                quantity: 5,
                expected: ExpectedVersion::Exact(0),
            },
            StockDecrement {
                batch_id: b_id,
                quantity: 5,
                // Wrong version: the whole commit must fail.
                expected: ExpectedVersion::Exact(9),
            },
        ];
        let err = room.commit_decrements(&staged).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(room.get(a_id).unwrap().remaining_stock, 10);
        assert_eq!(room.get(b_id).unwrap().remaining_stock, 10);
    }

    #[test]
    fn depleted_batches_leave_the_snapshot() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let mut room = StockRoom::new(tenant_id);
        let batch = test_batch(tenant_id, product_id, date(2026, 3, 1), 3);
        let id = batch.id;
        room.add_batch(batch).unwrap();

        room.decrement(id, 3, ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(room.get(id).unwrap().status, BatchStatus::Depleted);
        assert!(room.batches_for(product_id).is_empty());
    }

    #[test]
    fn restock_revives_a_depleted_batch() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let mut room = StockRoom::new(tenant_id);
        let batch = test_batch(tenant_id, product_id, date(2026, 3, 1), 2);
        let id = batch.id;
        room.add_batch(batch).unwrap();

        room.decrement(id, 2, ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(room.get(id).unwrap().status, BatchStatus::Depleted);

        room.restock(id, 2).unwrap();
        let revived = room.get(id).unwrap();
        assert_eq!(revived.status, BatchStatus::Active);
        assert_eq!(revived.remaining_stock, 2);
    }

    #[test]
    fn retire_expired_blocks_stale_batches() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let mut room = StockRoom::new(tenant_id);
        let stale = test_batch(tenant_id, product_id, date(2026, 3, 1), 5);
        let fresh = test_batch(tenant_id, product_id, date(2026, 6, 1), 5);
        let fresh_id = fresh.id;
        room.add_batch(stale).unwrap();
        room.add_batch(fresh).unwrap();

        room.retire_expired(date(2026, 4, 1));
        let snapshot = room.batches_for(product_id);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, fresh_id);
    }

    #[test]
    fn cross_tenant_batch_is_rejected() {
        let mut room = StockRoom::new(TenantId::new());
        let foreign = test_batch(
            TenantId::new(),
            ProductId::new(AggregateId::new()),
            date(2026, 3, 1),
            5,
        );
        let err = room.add_batch(foreign).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
