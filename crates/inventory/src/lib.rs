//! Inventory module: product batches and first-expiring-first-out allocation.
//!
//! Allocation is a pure computation over a batch snapshot; the actual stock
//! decrement happens separately, inside the same unit of work as bill
//! finalization, so a computed allocation can never diverge from recorded
//! stock.

pub mod allocation;
pub mod batch;
pub mod stock;

pub use allocation::{AllocatedLine, Allocation, RequestedLine, allocate};
pub use batch::{BatchId, BatchStatus, ProductBatch, ProductId};
pub use stock::{StockDecrement, StockRoom};
