//! Row decoding shared by the Postgres repositories.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::Row;

use forgebill_catalog::Position;
use forgebill_core::{CustomerId, DomainError, PositionId, TransactionId};
use forgebill_customers::Customer;
use forgebill_invoicing::InvoiceKind;
use forgebill_ledger::{PaymentMedium, Transaction, TransactionKind};

use crate::error::{StoreError, StoreResult};

pub(crate) fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Decode(format!("{name}: {e}")))
}

fn tag<T>(row: &PgRow, name: &str) -> StoreResult<T>
where
    T: FromStr<Err = DomainError>,
{
    let raw: String = column(row, name)?;
    raw.parse()
        .map_err(|e: DomainError| StoreError::Decode(format!("{name}: {e}")))
}

pub(crate) const CUSTOMER_COLUMNS: &str =
    "cu.id AS customer_id, cu.first_name, cu.last_name, cu.street, cu.postal_code, cu.city, cu.tax_id";

/// Decode a customer selected with [`CUSTOMER_COLUMNS`].
pub(crate) fn customer(row: &PgRow) -> StoreResult<Customer> {
    Ok(Customer {
        id: CustomerId::new(column(row, "customer_id")?),
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        street: column(row, "street")?,
        postal_code: column(row, "postal_code")?,
        city: column(row, "city")?,
        tax_id: column(row, "tax_id")?,
    })
}

pub(crate) const POSITION_COLUMNS: &str =
    "p.id AS position_id, p.text, p.price, p.unit";

/// Decode a position selected with [`POSITION_COLUMNS`].
pub(crate) fn position(row: &PgRow) -> StoreResult<Position> {
    Ok(Position {
        id: PositionId::new(column(row, "position_id")?),
        text: column(row, "text")?,
        price: column::<Decimal>(row, "price")?,
        unit: column(row, "unit")?,
    })
}

pub(crate) fn invoice_kind(row: &PgRow) -> StoreResult<InvoiceKind> {
    tag(row, "kind")
}

pub(crate) fn timestamp(row: &PgRow, name: &str) -> StoreResult<DateTime<Utc>> {
    column(row, name)
}

pub(crate) fn transaction(row: &PgRow) -> StoreResult<Transaction> {
    Ok(Transaction {
        id: TransactionId::new(column(row, "id")?),
        amount: column::<Decimal>(row, "amount")?,
        description: column(row, "description")?,
        date: column::<NaiveDate>(row, "booked_on")?,
        kind: tag::<TransactionKind>(row, "kind")?,
        medium: tag::<PaymentMedium>(row, "medium")?,
    })
}
