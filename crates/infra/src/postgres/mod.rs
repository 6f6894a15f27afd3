//! Postgres-backed billing store.
//!
//! Every write that touches more than one table (draft creation, header updates
//! with foreign keys) runs inside a single transaction. Reads that hydrate a
//! contract or invoice graph use two queries: headers joined with customers,
//! then the join records of all returned headers joined with their positions.
//!
//! Errors are mapped through [`map_sqlx_error`](crate::error::map_sqlx_error);
//! foreign key violations surface as `StoreError::Constraint`.

mod contracts;
mod customers;
mod invoices;
mod positions;
mod rows;
mod transactions;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgExecutor, PgPool, Row};
use tracing::{info, instrument};

use forgebill_catalog::{LineItem, Position, PositionRef, PositionRequest};
use forgebill_core::PositionId;

use crate::error::{map_sqlx_error, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../schema/billing.sql");

#[derive(Debug, Clone)]
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    /// `PgPool` is already a shared handle; clones of the store share its connections.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        info!(max_connections, "billing store connection pool initialized");
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes. Safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn apply_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub(crate) async fn insert_position<'e, E>(
    executor: E,
    request: &PositionRequest,
) -> StoreResult<Position>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO positions (text, price, unit)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&request.text)
    .bind(request.price)
    .bind(&request.unit)
    .fetch_one(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_position", e))?;

    let id: i64 = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("insert_position", e))?;
    Ok(Position::from_request(PositionId::new(id), request.clone()))
}

/// Insert inline positions of a draft, returning `(position_id, amount)` per line.
pub(crate) async fn materialize_lines(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    lines: Vec<LineItem>,
) -> StoreResult<Vec<(PositionId, rust_decimal::Decimal)>> {
    let mut resolved = Vec::with_capacity(lines.len());
    for line in lines {
        let position_id = match line.position {
            PositionRef::Existing(id) => id,
            PositionRef::New(request) => insert_position(&mut **tx, &request).await?.id,
        };
        resolved.push((position_id, line.amount));
    }
    Ok(resolved)
}

pub(crate) async fn row_exists<'e, E>(executor: E, sql: &'static str, id: i64) -> StoreResult<bool>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(sql)
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(|e| map_sqlx_error("exists", e))?;
    row.try_get::<bool, _>(0)
        .map_err(|e| map_sqlx_error("exists", e))
}

/// Turn an `UPDATE`/`DELETE` outcome into `RowMissing` when nothing matched.
pub(crate) fn expect_one(affected: u64, table: &'static str, id: i64) -> StoreResult<()> {
    if affected == 0 {
        Err(StoreError::RowMissing { table, id })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rows_affected_is_row_missing() {
        let err = expect_one(0, "invoices", 9).unwrap_err();
        assert!(matches!(err, StoreError::RowMissing { table: "invoices", id: 9 }));
        assert!(expect_one(1, "invoices", 9).is_ok());
    }

    #[tokio::test]
    async fn cloned_store_shares_one_pool() {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_lazy("postgres://billing@localhost/billing")
            .unwrap();
        let store = PostgresBillingStore::new(pool);
        let copy = store.clone();

        assert!(!copy.pool().is_closed());
        store.pool().close().await;
        assert!(copy.pool().is_closed());
    }

    #[test]
    fn schema_never_cascades() {
        assert!(!SCHEMA.to_ascii_uppercase().contains("CASCADE"));
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS contract_positions"));
    }
}
