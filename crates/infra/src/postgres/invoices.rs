use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use tracing::instrument;

use forgebill_core::{CustomerId, InvoiceId, InvoicePositionId, PositionId};
use forgebill_invoicing::{Invoice, InvoiceDetails, InvoiceLine, InvoicePosition, NewInvoice};

use super::rows::{self, column, CUSTOMER_COLUMNS, POSITION_COLUMNS};
use super::{expect_one, materialize_lines, row_exists, PostgresBillingStore};
use crate::error::{map_sqlx_error, StoreResult};
use crate::repository::InvoiceRepository;

const HEADER_COLUMNS: &str =
    "id, created_at, customer_id, start_at, finish_at, deposit, deposit_paid_at, kind";

fn invoice_header(row: &PgRow) -> StoreResult<Invoice> {
    Ok(Invoice {
        id: InvoiceId::new(column(row, "id")?),
        created_at: rows::timestamp(row, "created_at")?,
        customer_id: CustomerId::new(column(row, "customer_id")?),
        start: rows::timestamp(row, "start_at")?,
        finish: rows::timestamp(row, "finish_at")?,
        deposit: column(row, "deposit")?,
        deposit_paid_at: column(row, "deposit_paid_at")?,
        kind: rows::invoice_kind(row)?,
        positions: Vec::new(),
    })
}

fn invoice_position(row: &PgRow) -> StoreResult<InvoicePosition> {
    Ok(InvoicePosition {
        id: InvoicePositionId::new(column(row, "id")?),
        invoice_id: InvoiceId::new(column(row, "invoice_id")?),
        position_id: PositionId::new(column(row, "position_id")?),
        amount: column(row, "amount")?,
    })
}

impl PostgresBillingStore {
    async fn attach_invoice_positions(&self, mut invoices: Vec<Invoice>) -> StoreResult<Vec<Invoice>> {
        if invoices.is_empty() {
            return Ok(invoices);
        }
        let ids: Vec<i64> = invoices.iter().map(|i| i.id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, invoice_id, position_id, amount
            FROM invoice_positions
            WHERE invoice_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("load_invoice_positions", e))?;

        let mut by_invoice: HashMap<InvoiceId, Vec<InvoicePosition>> = HashMap::new();
        for row in &rows {
            let ip = invoice_position(row)?;
            by_invoice.entry(ip.invoice_id).or_default().push(ip);
        }
        for invoice in &mut invoices {
            invoice.positions = by_invoice.remove(&invoice.id).unwrap_or_default();
        }
        Ok(invoices)
    }

    async fn load_invoice_details(
        &self,
        filter: &str,
        bind: Option<i64>,
        operation: &'static str,
    ) -> StoreResult<Vec<InvoiceDetails>> {
        let sql = format!(
            "SELECT i.id, i.created_at, i.start_at, i.finish_at, i.deposit, i.deposit_paid_at, i.kind, \
             {CUSTOMER_COLUMNS} \
             FROM invoices i JOIN customers cu ON cu.id = i.customer_id \
             {filter} ORDER BY i.id"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let headers = query
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids = headers
            .iter()
            .map(|row| column::<i64>(row, "id"))
            .collect::<StoreResult<Vec<_>>>()?;
        let sql = format!(
            "SELECT ip.id AS line_id, ip.invoice_id, ip.amount, {POSITION_COLUMNS} \
             FROM invoice_positions ip JOIN positions p ON p.id = ip.position_id \
             WHERE ip.invoice_id = ANY($1) ORDER BY ip.id"
        );
        let line_rows = sqlx::query(&sql)
            .bind(&ids)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let mut lines: HashMap<i64, Vec<InvoiceLine>> = HashMap::new();
        for row in &line_rows {
            let owner: i64 = column(row, "invoice_id")?;
            lines.entry(owner).or_default().push(InvoiceLine {
                id: InvoicePositionId::new(column(row, "line_id")?),
                position: rows::position(row)?,
                amount: column(row, "amount")?,
            });
        }

        headers
            .iter()
            .map(|row| {
                let id: i64 = column(row, "id")?;
                Ok(InvoiceDetails {
                    id: InvoiceId::new(id),
                    created_at: rows::timestamp(row, "created_at")?,
                    customer: rows::customer(row)?,
                    start: rows::timestamp(row, "start_at")?,
                    finish: rows::timestamp(row, "finish_at")?,
                    deposit: column(row, "deposit")?,
                    deposit_paid_at: column(row, "deposit_paid_at")?,
                    kind: rows::invoice_kind(row)?,
                    lines: lines.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl InvoiceRepository for PostgresBillingStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<Invoice>> {
        let sql = format!("SELECT {HEADER_COLUMNS} FROM invoices ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error("list_invoices", e))?;
        let invoices = rows.iter().map(invoice_header).collect::<StoreResult<Vec<_>>>()?;
        self.attach_invoice_positions(invoices).await
    }

    #[instrument(skip(self), err)]
    async fn list_details(&self) -> StoreResult<Vec<InvoiceDetails>> {
        self.load_invoice_details("", None, "list_invoice_details").await
    }

    #[instrument(skip(self), fields(invoice_id = %id), err)]
    async fn get(&self, id: InvoiceId) -> StoreResult<Option<Invoice>> {
        let sql = format!("SELECT {HEADER_COLUMNS} FROM invoices WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("get_invoice", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let invoices = self.attach_invoice_positions(vec![invoice_header(&row)?]).await?;
        Ok(invoices.into_iter().next())
    }

    #[instrument(skip(self), fields(invoice_id = %id), err)]
    async fn get_details(&self, id: InvoiceId) -> StoreResult<Option<InvoiceDetails>> {
        let details = self
            .load_invoice_details("WHERE i.id = $1", Some(id.get()), "get_invoice_details")
            .await?;
        Ok(details.into_iter().next())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id), err)]
    async fn list_by_customer(&self, customer_id: CustomerId) -> StoreResult<Vec<InvoiceDetails>> {
        self.load_invoice_details(
            "WHERE i.customer_id = $1",
            Some(customer_id.get()),
            "list_invoices_by_customer",
        )
        .await
    }

    #[instrument(
        skip(self, draft),
        fields(customer_id = %draft.customer_id, kind = draft.kind.as_str(), line_count = draft.lines.len()),
        err
    )]
    async fn create(&self, draft: NewInvoice) -> StoreResult<InvoiceId> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let lines = materialize_lines(&mut tx, draft.lines).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (created_at, customer_id, start_at, finish_at, deposit, deposit_paid_at, kind)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(draft.created_at)
        .bind(draft.customer_id.get())
        .bind(draft.start)
        .bind(draft.finish)
        .bind(draft.deposit)
        .bind(draft.deposit_paid_at)
        .bind(draft.kind.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_invoice", e))?;

        for (position_id, amount) in lines {
            sqlx::query(
                "INSERT INTO invoice_positions (invoice_id, position_id, amount) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(position_id.get())
            .bind(amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_invoice_position", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(InvoiceId::new(id))
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id), err)]
    async fn update(&self, invoice: &Invoice) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET customer_id = $2, start_at = $3, finish_at = $4, deposit = $5,
                deposit_paid_at = $6, kind = $7
            WHERE id = $1
            "#,
        )
        .bind(invoice.id.get())
        .bind(invoice.customer_id.get())
        .bind(invoice.start)
        .bind(invoice.finish)
        .bind(invoice.deposit)
        .bind(invoice.deposit_paid_at)
        .bind(invoice.kind.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| map_sqlx_error("update_invoice", e))?;

        expect_one(result.rows_affected(), "invoices", invoice.id.get())
    }

    #[instrument(skip(self), fields(invoice_id = %id), err)]
    async fn delete_lines(&self, id: InvoiceId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM invoice_positions WHERE invoice_id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_invoice_positions", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(invoice_id = %id), err)]
    async fn delete(&self, id: InvoiceId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_invoice", e))?;

        expect_one(result.rows_affected(), "invoices", id.get())
    }

    async fn exists(&self, id: InvoiceId) -> StoreResult<bool> {
        row_exists(
            self.pool(),
            "SELECT EXISTS (SELECT 1 FROM invoices WHERE id = $1)",
            id.get(),
        )
        .await
    }
}
