//! Billing module: the sale document, its derived lifecycle state, the
//! immutability guard, and transactional sale finalization.
//!
//! Bill state is never stored. It is recomputed from the document's facts
//! (status, print count, paid amount, tax-filed flag) on every check, so a
//! stored state can never diverge from the facts that define it.

pub mod bill;
pub mod checkout;
pub mod guard;
pub mod state;


pub use bill::{
    Bill, BillCommand, BillEvent, BillId, BillLine, BillStatus, FinalizeBill, MarkGstFiled,
    OpenBill, RecordPayment, RecordPrint, ReplaceLines,
};
pub use checkout::{Checkout, FinalizedSale, PinCredentials, SaleAccounts};
pub use guard::{BillMutation, MutationCheck, check_delete, check_edit};
pub use state::BillState;
