use async_trait::async_trait;
use tracing::instrument;

use forgebill_core::TransactionId;
use forgebill_ledger::{Transaction, TransactionRequest};

use super::rows;
use super::{expect_one, row_exists, PostgresBillingStore};
use crate::error::{map_sqlx_error, StoreResult};
use crate::repository::TransactionRepository;

#[async_trait]
impl TransactionRepository for PostgresBillingStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT id, amount, description, booked_on, kind, medium FROM transactions ORDER BY id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;
        rows.iter().map(rows::transaction).collect()
    }

    #[instrument(skip(self), fields(transaction_id = %id), err)]
    async fn get(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query(
            "SELECT id, amount, description, booked_on, kind, medium FROM transactions WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("get_transaction", e))?;
        row.as_ref().map(rows::transaction).transpose()
    }

    #[instrument(skip(self, request), err)]
    async fn create(&self, request: TransactionRequest) -> StoreResult<Transaction> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (amount, description, booked_on, kind, medium)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(request.amount)
        .bind(&request.description)
        .bind(request.date)
        .bind(request.kind.as_str())
        .bind(request.medium.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_sqlx_error("create_transaction", e))?;

        Ok(Transaction::from_request(TransactionId::new(id), request))
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id), err)]
    async fn update(&self, transaction: &Transaction) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET amount = $2, description = $3, booked_on = $4, kind = $5, medium = $6
            WHERE id = $1
            "#,
        )
        .bind(transaction.id.get())
        .bind(transaction.amount)
        .bind(&transaction.description)
        .bind(transaction.date)
        .bind(transaction.kind.as_str())
        .bind(transaction.medium.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| map_sqlx_error("update_transaction", e))?;

        expect_one(result.rows_affected(), "transactions", transaction.id.get())
    }

    #[instrument(skip(self), fields(transaction_id = %id), err)]
    async fn delete(&self, id: TransactionId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_transaction", e))?;

        expect_one(result.rows_affected(), "transactions", id.get())
    }

    async fn exists(&self, id: TransactionId) -> StoreResult<bool> {
        row_exists(
            self.pool(),
            "SELECT EXISTS (SELECT 1 FROM transactions WHERE id = $1)",
            id.get(),
        )
        .await
    }
}
