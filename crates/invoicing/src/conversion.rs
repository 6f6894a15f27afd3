//! Contract → invoice conversion.
//!
//! The draft is a plain [`InvoiceRequest`]: nothing is read or written here, and
//! the caller persists it through the normal invoice create path. Every line
//! carries the position id, so no inline position is created when it is saved.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use forgebill_catalog::LineItemRequest;
use forgebill_contracts::ContractDetails;

use crate::invoice::{InvoiceKind, InvoiceRequest};

/// Build an invoice-creation payload mirroring a contract's lines.
///
/// The service period starts and finishes at `now` (the conversion time, not the
/// contract's creation time); the kind is [`InvoiceKind::FromContract`].
pub fn draft_from_contract(contract: &ContractDetails, now: DateTime<Utc>) -> InvoiceRequest {
    InvoiceRequest {
        customer_id: contract.customer.id,
        start: now,
        finish: now,
        deposit: Decimal::ZERO,
        deposit_paid_at: None,
        kind: InvoiceKind::FromContract,
        positions: contract
            .lines
            .iter()
            .map(|line| LineItemRequest {
                position_id: Some(line.position.id.get()),
                text: Some(line.position.text.clone()),
                price: Some(line.position.price),
                unit: Some(line.position.unit.clone()),
                amount: line.amount,
            })
            .collect(),
    }
}
