//! Response shapes handed to the transport layer.
//!
//! Every response is fully hydrated: customers and positions are embedded, and
//! totals are computed from the live position prices at mapping time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use forgebill_catalog::Position;
use forgebill_contracts::{ContractDetails, ContractLine};
use forgebill_core::{ContractId, DomainResult, InvoiceId};
use forgebill_customers::Customer;
use forgebill_invoicing::{InvoiceDetails, InvoiceKind, InvoiceLine};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineResponse {
    /// Join record id.
    pub id: i64,
    pub position: Position,
    pub amount: Decimal,
    pub total: Decimal,
}

impl LineResponse {
    fn from_contract_line(line: ContractLine) -> DomainResult<Self> {
        let total = line.total()?;
        Ok(Self {
            id: line.id.get(),
            position: line.position,
            amount: line.amount,
            total,
        })
    }

    fn from_invoice_line(line: InvoiceLine) -> DomainResult<Self> {
        let total = line.total()?;
        Ok(Self {
            id: line.id.get(),
            position: line.position,
            amount: line.amount,
            total,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractResponse {
    pub id: ContractId,
    pub created_at: DateTime<Utc>,
    pub accepted: bool,
    pub customer: Customer,
    pub positions: Vec<LineResponse>,
    pub total: Decimal,
}

impl ContractResponse {
    pub fn from_details(details: ContractDetails) -> DomainResult<Self> {
        let total = details.total()?;
        let positions = details
            .lines
            .into_iter()
            .map(LineResponse::from_contract_line)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Self {
            id: details.id,
            created_at: details.created_at,
            accepted: details.accepted,
            customer: details.customer,
            positions,
            total,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceResponse {
    pub id: InvoiceId,
    pub created_at: DateTime<Utc>,
    pub customer: Customer,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    pub deposit: Decimal,
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub kind: InvoiceKind,
    pub positions: Vec<LineResponse>,
    pub total: Decimal,
    /// Total minus the deposit once it has been paid.
    pub outstanding: Decimal,
}

impl InvoiceResponse {
    pub fn from_details(details: InvoiceDetails) -> DomainResult<Self> {
        let total = details.total()?;
        let outstanding = details.outstanding()?;
        let positions = details
            .lines
            .into_iter()
            .map(LineResponse::from_invoice_line)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Self {
            id: details.id,
            created_at: details.created_at,
            customer: details.customer,
            start: details.start,
            finish: details.finish,
            deposit: details.deposit,
            deposit_paid_at: details.deposit_paid_at,
            kind: details.kind,
            positions,
            total,
            outstanding,
        })
    }
}

pub(crate) fn contract_responses(details: Vec<ContractDetails>) -> DomainResult<Vec<ContractResponse>> {
    details.into_iter().map(ContractResponse::from_details).collect()
}

pub(crate) fn invoice_responses(details: Vec<InvoiceDetails>) -> DomainResult<Vec<InvoiceResponse>> {
    details.into_iter().map(InvoiceResponse::from_details).collect()
}
