use async_trait::async_trait;
use tracing::instrument;

use forgebill_catalog::{Position, PositionRequest};
use forgebill_core::PositionId;

use super::rows::{self, POSITION_COLUMNS};
use super::{expect_one, insert_position, row_exists, PostgresBillingStore};
use crate::error::{map_sqlx_error, StoreResult};
use crate::repository::PositionRepository;

#[async_trait]
impl PositionRepository for PostgresBillingStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<Position>> {
        let sql = format!("SELECT {POSITION_COLUMNS} FROM positions p ORDER BY p.id");
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error("list_positions", e))?;
        rows.iter().map(rows::position).collect()
    }

    #[instrument(skip(self), fields(position_id = %id), err)]
    async fn get(&self, id: PositionId) -> StoreResult<Option<Position>> {
        let sql = format!("SELECT {POSITION_COLUMNS} FROM positions p WHERE p.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("get_position", e))?;
        row.as_ref().map(rows::position).transpose()
    }

    #[instrument(skip(self, request), err)]
    async fn create(&self, request: PositionRequest) -> StoreResult<Position> {
        insert_position(self.pool(), &request).await
    }

    #[instrument(skip(self, position), fields(position_id = %position.id), err)]
    async fn update(&self, position: &Position) -> StoreResult<()> {
        let result = sqlx::query("UPDATE positions SET text = $2, price = $3, unit = $4 WHERE id = $1")
            .bind(position.id.get())
            .bind(&position.text)
            .bind(position.price)
            .bind(&position.unit)
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("update_position", e))?;

        expect_one(result.rows_affected(), "positions", position.id.get())
    }

    #[instrument(skip(self), fields(position_id = %id), err)]
    async fn delete(&self, id: PositionId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM positions WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_position", e))?;

        expect_one(result.rows_affected(), "positions", id.get())
    }

    async fn exists(&self, id: PositionId) -> StoreResult<bool> {
        row_exists(
            self.pool(),
            "SELECT EXISTS (SELECT 1 FROM positions WHERE id = $1)",
            id.get(),
        )
        .await
    }

    #[instrument(skip(self), fields(position_id = %id), err)]
    async fn usage_count(&self, id: PositionId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COUNT(*) FROM contract_positions WHERE position_id = $1)
              + (SELECT COUNT(*) FROM invoice_positions WHERE position_id = $1)
            "#,
        )
        .bind(id.get())
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_sqlx_error("position_usage_count", e))?;

        Ok(count.max(0) as u64)
    }
}
