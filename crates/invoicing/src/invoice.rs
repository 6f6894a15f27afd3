use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgebill_catalog::{LineItem, LineItemRequest, Position};
use forgebill_core::{
    ensure_bounded, line_total, sum_totals, CustomerId, DomainError, DomainResult, Entity,
    InvoiceId, InvoicePositionId, PositionId, MAX_PRICE,
};
use forgebill_customers::Customer;

/// Invoice type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Standard,
    Deposit,
    Final,
    /// Drafted from a contract.
    FromContract,
}

impl InvoiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceKind::Standard => "standard",
            InvoiceKind::Deposit => "deposit",
            InvoiceKind::Final => "final",
            InvoiceKind::FromContract => "from_contract",
        }
    }
}

impl core::str::FromStr for InvoiceKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(InvoiceKind::Standard),
            "deposit" => Ok(InvoiceKind::Deposit),
            "final" => Ok(InvoiceKind::Final),
            "from_contract" => Ok(InvoiceKind::FromContract),
            other => Err(DomainError::validation(format!("unknown invoice kind '{other}'"))),
        }
    }
}

/// Join record: `amount` units of a position billed on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePosition {
    pub id: InvoicePositionId,
    pub invoice_id: InvoiceId,
    pub position_id: PositionId,
    pub amount: Decimal,
}

/// Invoice record with its join records (positions not loaded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub created_at: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    pub deposit: Decimal,
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub kind: InvoiceKind,
    pub positions: Vec<InvoicePosition>,
}

impl Invoice {
    /// Replace the header fields; join records are left untouched.
    pub fn apply(&mut self, request: &InvoiceRequest) {
        self.customer_id = request.customer_id;
        self.start = request.start;
        self.finish = request.finish;
        self.deposit = request.deposit;
        self.deposit_paid_at = request.deposit_paid_at;
        self.kind = request.kind;
    }
}

impl Entity for Invoice {
    const KIND: &'static str = "invoice";
    type Id = InvoiceId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A join record together with the live position it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLine {
    pub id: InvoicePositionId,
    pub position: Position,
    pub amount: Decimal,
}

impl InvoiceLine {
    pub fn total(&self) -> DomainResult<Decimal> {
        line_total(self.amount, self.position.price)
    }
}

/// Fully hydrated invoice: customer, join records and their positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDetails {
    pub id: InvoiceId,
    pub created_at: DateTime<Utc>,
    pub customer: Customer,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    pub deposit: Decimal,
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub kind: InvoiceKind,
    pub lines: Vec<InvoiceLine>,
}

impl InvoiceDetails {
    /// Sum of line totals, priced from the live positions.
    pub fn total(&self) -> DomainResult<Decimal> {
        sum_totals(
            self.lines
                .iter()
                .map(InvoiceLine::total)
                .collect::<DomainResult<Vec<_>>>()?,
        )
    }

    /// Total minus the deposit, once the deposit has been paid.
    pub fn outstanding(&self) -> DomainResult<Decimal> {
        let total = self.total()?;
        if self.deposit_paid_at.is_some() {
            Ok(total - self.deposit)
        } else {
            Ok(total)
        }
    }
}

/// Create payload for an invoice (also the update payload for its header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub customer_id: CustomerId,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    #[serde(default)]
    pub deposit: Decimal,
    #[serde(default)]
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub kind: InvoiceKind,
    #[serde(default)]
    pub positions: Vec<LineItemRequest>,
}

impl InvoiceRequest {
    /// Header rules shared by create and update.
    pub fn validate_header(&self) -> DomainResult<()> {
        if self.finish < self.start {
            return Err(DomainError::validation(
                "service period finish must not precede its start",
            ));
        }
        if self.deposit < Decimal::ZERO {
            return Err(DomainError::validation("deposit must not be negative"));
        }
        ensure_bounded("deposit", self.deposit, MAX_PRICE)
    }
}

/// Resolved invoice draft handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    pub deposit: Decimal,
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub kind: InvoiceKind,
    pub lines: Vec<LineItem>,
}
