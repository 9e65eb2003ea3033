//! First-expiring-first-out allocation of a requested sale line.

use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Money};

use crate::batch::{BatchId, ProductBatch, ProductId};

/// A raw sale line as the billing layer supplies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price per unit in minor currency units.
    pub unit_price: Money,
    /// Whole-line discount to pro-rate across allocation chunks.
    pub discount: Money,
    /// Whole-line tax to pro-rate across allocation chunks.
    pub tax: Money,
    /// An explicitly chosen batch. Manual choice always wins: allocation is
    /// skipped entirely when this is set.
    pub batch_id: Option<BatchId>,
}

/// One chunk of an allocated line: the part of the request satisfied by a
/// single batch. `batch_id = None` marks the unsatisfied shortfall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub batch_id: Option<BatchId>,
    pub discount: Money,
    pub tax: Money,
}

/// The full allocation result for one requested line.
///
/// Insufficient stock is a degraded success, not a failure: the shortfall
/// rides along as a final batchless chunk and callers must surface it to
/// the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    chunks: Vec<AllocatedLine>,
}

impl Allocation {
    pub fn chunks(&self) -> &[AllocatedLine] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<AllocatedLine> {
        self.chunks
    }

    /// Quantity that no batch could supply.
    pub fn shortfall(&self) -> i64 {
        self.chunks
            .iter()
            .filter(|c| c.batch_id.is_none())
            .map(|c| c.quantity)
            .sum()
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.shortfall() == 0
    }

    pub fn total_quantity(&self) -> i64 {
        self.chunks.iter().map(|c| c.quantity).sum()
    }
}

/// Share of `total` belonging to `chunk_qty` out of `line_qty`, rounded to
/// the nearest minor unit (half away from zero for the non-negative values
/// handled here).
fn prorate(total: Money, chunk_qty: i64, line_qty: i64) -> Money {
    let scaled = total.minor_units() as i128 * chunk_qty as i128;
    Money::from_minor(((2 * scaled + line_qty as i128) / (2 * line_qty as i128)) as i64)
}

/// Split a requested line across available batches in expiry order.
///
/// `batches` must be the product's snapshot ordered by expiry ascending,
/// ties broken by batch creation order (as `StockRoom::batches_for`
/// returns it). The walk takes `min(batch.remaining_stock, outstanding)`
/// from each batch until the request is satisfied or batches run out; any
/// remainder becomes a final chunk with no batch id.
///
/// Discount and tax are pro-rated per chunk; the final chunk absorbs the
/// rounding residual so the sums across chunks exactly equal the original
/// line values.
///
/// Pure and deterministic: identical input produces identical output, and
/// stock is never mutated here.
pub fn allocate(line: &RequestedLine, batches: &[ProductBatch]) -> DomainResult<Allocation> {
    if line.quantity <= 0 {
        return Err(DomainError::validation("requested quantity must be positive"));
    }
    if line.discount.is_negative() || line.tax.is_negative() {
        return Err(DomainError::validation("discount and tax cannot be negative"));
    }

    // Manual batch choice wins; the engine does not second-guess it.
    if let Some(batch_id) = line.batch_id {
        return Ok(Allocation {
            chunks: vec![AllocatedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                batch_id: Some(batch_id),
                discount: line.discount,
                tax: line.tax,
            }],
        });
    }

    let mut takes: Vec<(Option<BatchId>, i64)> = Vec::new();
    let mut outstanding = line.quantity;

    for batch in batches {
        if outstanding == 0 {
            break;
        }
        if batch.product_id != line.product_id {
            return Err(DomainError::invariant(
                "batch snapshot contains a different product",
            ));
        }
        if !batch.is_available() {
            continue;
        }
        let take = batch.remaining_stock.min(outstanding);
        takes.push((Some(batch.id), take));
        outstanding -= take;
    }

    if outstanding > 0 {
        takes.push((None, outstanding));
    }

    let mut chunks = Vec::with_capacity(takes.len());
    let mut discount_used = Money::ZERO;
    let mut tax_used = Money::ZERO;
    let last = takes.len() - 1;

    for (i, (batch_id, quantity)) in takes.into_iter().enumerate() {
        // The final chunk absorbs the rounding residual so totals are exact.
        let (discount, tax) = if i == last {
            (line.discount - discount_used, line.tax - tax_used)
        } else {
            (
                prorate(line.discount, quantity, line.quantity),
                prorate(line.tax, quantity, line.quantity),
            )
        };
        discount_used = discount_used + discount;
        tax_used = tax_used + tax;

        chunks.push(AllocatedLine {
            product_id: line.product_id,
            quantity,
            batch_id,
            discount,
            tax,
        });
    }

    Ok(Allocation { chunks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use shopledger_core::{AggregateId, TenantId};

    use crate::batch::BatchStatus;

    fn batch(
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

    fn line(product_id: ProductId, quantity: i64, discount: i64, tax: i64) -> RequestedLine {
        RequestedLine {
            product_id,
            quantity,
            unit_price: Money::from_minor(1_000),
            discount: Money::from_minor(discount),
            tax: Money::from_minor(tax),
            batch_id: None,
        }
    }

    fn days_ahead(days: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(days))
            .unwrap()
    }

    #[test]
    fn splits_across_batches_in_expiry_order_with_prorated_discount() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let near = batch(tenant_id, product_id, days_ahead(10), 4);
        let far = batch(tenant_id, product_id, days_ahead(20), 8);

        let allocation =
            allocate(&line(product_id, 10, 10, 0), &[near.clone(), far.clone()]).unwrap();

        let chunks = allocation.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].batch_id, Some(near.id));
        assert_eq!(chunks[0].quantity, 4);
        assert_eq!(chunks[0].discount, Money::from_minor(4));
        assert_eq!(chunks[1].batch_id, Some(far.id));
        assert_eq!(chunks[1].quantity, 6);
        assert_eq!(chunks[1].discount, Money::from_minor(6));
        assert!(allocation.is_fully_allocated());
    }

    #[test]
    fn shortfall_becomes_final_batchless_chunk() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let only = batch(tenant_id, product_id, days_ahead(5), 3);

        let allocation = allocate(&line(product_id, 10, 0, 0), &[only.clone()]).unwrap();

        let chunks = allocation.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].batch_id, Some(only.id));
        assert_eq!(chunks[0].quantity, 3);
        assert_eq!(chunks[1].batch_id, None);
        assert_eq!(chunks[1].quantity, 7);
        assert_eq!(allocation.shortfall(), 7);
        assert!(!allocation.is_fully_allocated());
        assert_eq!(allocation.total_quantity(), 10);
    }

    #[test]
    fn manual_batch_choice_skips_the_walk() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let near = batch(tenant_id, product_id, days_ahead(1), 100);
        let manual = BatchId::new(AggregateId::new());

        let mut requested = line(product_id, 5, 30, 12);
        requested.batch_id = Some(manual);

        let allocation = allocate(&requested, &[near]).unwrap();
        let chunks = allocation.chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].batch_id, Some(manual));
        assert_eq!(chunks[0].quantity, 5);
        assert_eq!(chunks[0].discount, Money::from_minor(30));
        assert_eq!(chunks[0].tax, Money::from_minor(12));
    }

    #[test]
    fn unavailable_batches_are_skipped() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let mut expired = batch(tenant_id, product_id, days_ahead(1), 50);
        expired.status = BatchStatus::Expired;
        let empty = batch(tenant_id, product_id, days_ahead(2), 0);
        let good = batch(tenant_id, product_id, days_ahead(3), 50);

        let allocation =
            allocate(&line(product_id, 10, 0, 0), &[expired, empty, good.clone()]).unwrap();
        assert_eq!(allocation.chunks().len(), 1);
        assert_eq!(allocation.chunks()[0].batch_id, Some(good.id));
    }

    #[test]
    fn rounding_residual_lands_on_the_last_chunk() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        // 3 + 3 + 1 of 7 with a discount of 10: 10*3/7 rounds to 4, 4, last
        // chunk takes 10 - 8 = 2.
        let a = batch(tenant_id, product_id, days_ahead(1), 3);
        let b = batch(tenant_id, product_id, days_ahead(2), 3);
        let c = batch(tenant_id, product_id, days_ahead(3), 1);

        let allocation = allocate(&line(product_id, 7, 10, 0), &[a, b, c]).unwrap();
        let discounts: Vec<i64> = allocation
            .chunks()
            .iter()
            .map(|chunk| chunk.discount.minor_units())
            .collect();
        assert_eq!(discounts, vec![4, 4, 2]);
        let total: i64 = discounts.iter().sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn invalid_quantity_is_rejected_before_anything_else() {
        let product_id = ProductId::new(AggregateId::new());
        let err = allocate(&line(product_id, 0, 0, 0), &[]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = allocate(&line(product_id, -4, 0, 0), &[]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn foreign_product_in_snapshot_is_an_invariant_violation() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let other = batch(tenant_id, ProductId::new(AggregateId::new()), days_ahead(1), 5);

        let err = allocate(&line(product_id, 3, 0, 0), &[other]).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn allocation_is_deterministic() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let batches = vec![
            batch(tenant_id, product_id, days_ahead(10), 4),
            batch(tenant_id, product_id, days_ahead(20), 8),
        ];
        let requested = line(product_id, 10, 33, 17);

        let first = allocate(&requested, &batches).unwrap();
        let second = allocate(&requested, &batches).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: chunk quantities always sum to the requested quantity,
        /// and pro-rated discount/tax always sum exactly to the originals,
        /// whatever the batch shapes.
        #[test]
        fn chunk_sums_are_exact(
            quantity in 1i64..500,
            discount in 0i64..100_000,
            tax in 0i64..100_000,
            stocks in prop::collection::vec(0i64..200, 0..6)
        ) {
            let tenant_id = TenantId::new();
            let product_id = ProductId::new(AggregateId::new());
            let batches: Vec<ProductBatch> = stocks
                .iter()
                .enumerate()
                .map(|(i, stock)| batch(tenant_id, product_id, days_ahead(i as u64), *stock))
                .collect();

            let allocation =
                allocate(&line(product_id, quantity, discount, tax), &batches).unwrap();

            prop_assert_eq!(allocation.total_quantity(), quantity);
            let discount_sum: i64 = allocation
                .chunks()
                .iter()
                .map(|c| c.discount.minor_units())
                .sum();
            let tax_sum: i64 = allocation.chunks().iter().map(|c| c.tax.minor_units()).sum();
            prop_assert_eq!(discount_sum, discount);
            prop_assert_eq!(tax_sum, tax);

            // No chunk takes more than its batch had.
            for chunk in allocation.chunks() {
                if let Some(batch_id) = chunk.batch_id {
                    let source = batches.iter().find(|b| b.id == batch_id).unwrap();
                    prop_assert!(chunk.quantity <= source.remaining_stock);
                }
            }
        }
    }
}
