//! `forgebill-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error model and the monetary arithmetic shared by
//! contracts and invoices.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    ContractId, ContractPositionId, CustomerId, InvoiceId, InvoicePositionId, PositionId,
    TransactionId,
};
pub use money::{ensure_bounded, line_total, sum_totals, MAX_AMOUNT, MAX_PRICE, MONEY_SCALE};
pub use rust_decimal::Decimal;
