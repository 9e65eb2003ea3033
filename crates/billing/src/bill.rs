use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, TenantId};
use shopledger_events::Event;
use shopledger_inventory::{BatchId, ProductId};

/// Bill identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillId(pub AggregateId);

impl BillId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BillId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Stored document status. This is a fact about the document, not its
/// lifecycle state; see `BillState` for the derived state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Draft,
    Unpaid,
    Partial,
    Paid,
}

/// One line on the bill, carrying the batch the sale was allocated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price per unit in minor currency units.
    pub unit_price: Money,
    pub discount: Money,
    pub tax: Money,
    /// None until allocation, or for the unsatisfied part of a short sale.
    pub batch_id: Option<BatchId>,
}

impl BillLine {
    /// quantity × unit price, before discount and tax.
    pub fn gross(&self) -> Money {
        Money::from_minor(self.quantity * self.unit_price.minor_units())
    }

    /// gross − discount + tax.
    pub fn net(&self) -> Money {
        self.gross() - self.discount + self.tax
    }
}

/// Aggregate root: Bill.
///
/// Transitions happen only via external triggers: finalization, a payment
/// recorded, the document printed, inclusion in a tax filing. Lock
/// strictness never regresses; a refund is a reversal entry elsewhere,
/// never a lowered state here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bill {
    id: BillId,
    tenant_id: Option<TenantId>,
    status: BillStatus,
    print_count: u32,
    paid_amount: Money,
    gst_filed: bool,
    opened_at: Option<DateTime<Utc>>,
    lines: Vec<BillLine>,
    version: u64,
    created: bool,
}

impl Bill {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: BillId) -> Self {
        Self {
            id,
            tenant_id: None,
            status: BillStatus::Draft,
            print_count: 0,
            paid_amount: Money::ZERO,
            gst_filed: false,
            opened_at: None,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> BillId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn status(&self) -> BillStatus {
        self.status
    }

    pub fn print_count(&self) -> u32 {
        self.print_count
    }

    pub fn paid_amount(&self) -> Money {
        self.paid_amount
    }

    pub fn is_gst_filed(&self) -> bool {
        self.gst_filed
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    pub fn lines(&self) -> &[BillLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(|l| l.net()).sum()
    }

    pub fn outstanding(&self) -> Money {
        self.total().saturating_sub(self.paid_amount)
    }
}

impl AggregateRoot for Bill {
    type Id = BillId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenBill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBill {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReplaceLines (finalization writes allocated lines back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceLines {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub lines: Vec<BillLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FinalizeBill (draft becomes a billed, unpaid document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeBill {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPrint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPrint {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkGstFiled (the document enters the absorbing frozen state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkGstFiled {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillCommand {
    OpenBill(OpenBill),
    ReplaceLines(ReplaceLines),
    FinalizeBill(FinalizeBill),
    RecordPayment(RecordPayment),
    RecordPrint(RecordPrint),
    MarkGstFiled(MarkGstFiled),
}

/// Event: BillOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillOpened {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LinesReplaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesReplaced {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub lines: Vec<BillLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BillFinalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillFinalized {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub amount: Money,
    /// Status after this payment (Partial or Paid).
    pub status_after: BillStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BillPrinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillPrinted {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MarkedGstFiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedGstFiled {
    pub tenant_id: TenantId,
    pub bill_id: BillId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillEvent {
    BillOpened(BillOpened),
    LinesReplaced(LinesReplaced),
    BillFinalized(BillFinalized),
    PaymentRecorded(PaymentRecorded),
    BillPrinted(BillPrinted),
    MarkedGstFiled(MarkedGstFiled),
}

impl Event for BillEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillEvent::BillOpened(_) => "billing.bill.opened",
            BillEvent::LinesReplaced(_) => "billing.bill.lines_replaced",
            BillEvent::BillFinalized(_) => "billing.bill.finalized",
            BillEvent::PaymentRecorded(_) => "billing.bill.payment_recorded",
            BillEvent::BillPrinted(_) => "billing.bill.printed",
            BillEvent::MarkedGstFiled(_) => "billing.bill.marked_gst_filed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BillEvent::BillOpened(e) => e.occurred_at,
            BillEvent::LinesReplaced(e) => e.occurred_at,
            BillEvent::BillFinalized(e) => e.occurred_at,
            BillEvent::PaymentRecorded(e) => e.occurred_at,
            BillEvent::BillPrinted(e) => e.occurred_at,
            BillEvent::MarkedGstFiled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Bill {
    type Command = BillCommand;
    type Event = BillEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BillEvent::BillOpened(e) => {
                self.id = e.bill_id;
                self.tenant_id = Some(e.tenant_id);
                self.status = BillStatus::Draft;
                self.opened_at = Some(e.occurred_at);
                self.lines.clear();
                self.created = true;
            }
            BillEvent::LinesReplaced(e) => {
                self.lines = e.lines.clone();
            }
            BillEvent::BillFinalized(_) => {
                self.status = BillStatus::Unpaid;
            }
            BillEvent::PaymentRecorded(e) => {
                self.paid_amount = self.paid_amount + e.amount;
                self.status = e.status_after;
            }
            BillEvent::BillPrinted(_) => {
                self.print_count += 1;
            }
            BillEvent::MarkedGstFiled(_) => {
                self.gst_filed = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BillCommand::OpenBill(cmd) => self.handle_open(cmd),
            BillCommand::ReplaceLines(cmd) => self.handle_replace_lines(cmd),
            BillCommand::FinalizeBill(cmd) => self.handle_finalize(cmd),
            BillCommand::RecordPayment(cmd) => self.handle_record_payment(cmd),
            BillCommand::RecordPrint(cmd) => self.handle_record_print(cmd),
            BillCommand::MarkGstFiled(cmd) => self.handle_mark_gst_filed(cmd),
        }
    }
}

impl Bill {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_bill_id(&self, bill_id: BillId) -> Result<(), DomainError> {
        if self.id != bill_id {
            return Err(DomainError::invariant("bill_id mismatch"));
        }
        Ok(())
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenBill) -> Result<Vec<BillEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("bill already exists"));
        }
        Ok(vec![BillEvent::BillOpened(BillOpened {
            tenant_id: cmd.tenant_id,
            bill_id: cmd.bill_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace_lines(&self, cmd: &ReplaceLines) -> Result<Vec<BillEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_bill_id(cmd.bill_id)?;

        // The guard decides whether an edit is allowed; the aggregate only
        // enforces the absolute invariant no authorization can lift.
        if self.gst_filed {
            return Err(DomainError::immutability(
                "tax-filed documents are permanently frozen",
            ));
        }

        if cmd.lines.is_empty() {
            return Err(DomainError::validation("bill needs at least one line"));
        }
        for line in &cmd.lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation("line quantity must be positive"));
            }
            if line.unit_price.is_negative()
                || line.discount.is_negative()
                || line.tax.is_negative()
            {
                return Err(DomainError::validation("line amounts cannot be negative"));
            }
        }

        Ok(vec![BillEvent::LinesReplaced(LinesReplaced {
            tenant_id: cmd.tenant_id,
            bill_id: cmd.bill_id,
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_finalize(&self, cmd: &FinalizeBill) -> Result<Vec<BillEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_bill_id(cmd.bill_id)?;

        if self.status != BillStatus::Draft {
            return Err(DomainError::invariant("only draft bills can be finalized"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot finalize a bill without lines"));
        }

        Ok(vec![BillEvent::BillFinalized(BillFinalized {
            tenant_id: cmd.tenant_id,
            bill_id: cmd.bill_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_payment(&self, cmd: &RecordPayment) -> Result<Vec<BillEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_bill_id(cmd.bill_id)?;

        if cmd.amount <= Money::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        if self.status == BillStatus::Draft {
            return Err(DomainError::invariant(
                "cannot record a payment against a draft",
            ));
        }

        let paid_after = self.paid_amount + cmd.amount;
        let status_after = if paid_after >= self.total() {
            BillStatus::Paid
        } else {
            BillStatus::Partial
        };

        Ok(vec![BillEvent::PaymentRecorded(PaymentRecorded {
            tenant_id: cmd.tenant_id,
            bill_id: cmd.bill_id,
            amount: cmd.amount,
            status_after,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_print(&self, cmd: &RecordPrint) -> Result<Vec<BillEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_bill_id(cmd.bill_id)?;

        if self.status == BillStatus::Draft {
            return Err(DomainError::invariant("cannot print a draft"));
        }

        Ok(vec![BillEvent::BillPrinted(BillPrinted {
            tenant_id: cmd.tenant_id,
            bill_id: cmd.bill_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_gst_filed(&self, cmd: &MarkGstFiled) -> Result<Vec<BillEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_bill_id(cmd.bill_id)?;

        if self.gst_filed {
            return Err(DomainError::conflict("bill is already tax-filed"));
        }
        if self.status == BillStatus::Draft {
            return Err(DomainError::invariant("cannot file a draft"));
        }

        Ok(vec![BillEvent::MarkedGstFiled(MarkedGstFiled {
            tenant_id: cmd.tenant_id,
            bill_id: cmd.bill_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
