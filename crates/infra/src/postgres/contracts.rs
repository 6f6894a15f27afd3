use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use tracing::instrument;

use forgebill_contracts::{Contract, ContractDetails, ContractLine, ContractPosition, NewContract};
use forgebill_core::{ContractId, ContractPositionId, CustomerId, PositionId};

use super::rows::{self, column, CUSTOMER_COLUMNS, POSITION_COLUMNS};
use super::{expect_one, materialize_lines, row_exists, PostgresBillingStore};
use crate::error::{map_sqlx_error, StoreResult};
use crate::repository::ContractRepository;

fn contract_header(row: &PgRow) -> StoreResult<Contract> {
    Ok(Contract {
        id: ContractId::new(column(row, "id")?),
        created_at: rows::timestamp(row, "created_at")?,
        customer_id: CustomerId::new(column(row, "customer_id")?),
        accepted: column(row, "accepted")?,
        positions: Vec::new(),
    })
}

fn contract_position(row: &PgRow) -> StoreResult<ContractPosition> {
    Ok(ContractPosition {
        id: ContractPositionId::new(column(row, "id")?),
        contract_id: ContractId::new(column(row, "contract_id")?),
        position_id: PositionId::new(column(row, "position_id")?),
        amount: column(row, "amount")?,
    })
}

impl PostgresBillingStore {
    async fn attach_contract_positions(&self, mut contracts: Vec<Contract>) -> StoreResult<Vec<Contract>> {
        if contracts.is_empty() {
            return Ok(contracts);
        }
        let ids: Vec<i64> = contracts.iter().map(|c| c.id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, contract_id, position_id, amount
            FROM contract_positions
            WHERE contract_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("load_contract_positions", e))?;

        let mut by_contract: HashMap<ContractId, Vec<ContractPosition>> = HashMap::new();
        for row in &rows {
            let cp = contract_position(row)?;
            by_contract.entry(cp.contract_id).or_default().push(cp);
        }
        for contract in &mut contracts {
            contract.positions = by_contract.remove(&contract.id).unwrap_or_default();
        }
        Ok(contracts)
    }

    /// Load contract headers with their customer, then every line with its position.
    async fn load_contract_details(
        &self,
        filter: &str,
        bind: Option<i64>,
        operation: &'static str,
    ) -> StoreResult<Vec<ContractDetails>> {
        let sql = format!(
            "SELECT c.id, c.created_at, c.accepted, {CUSTOMER_COLUMNS} \
             FROM contracts c JOIN customers cu ON cu.id = c.customer_id \
             {filter} ORDER BY c.id"
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
            "SELECT cp.id AS line_id, cp.contract_id, cp.amount, {POSITION_COLUMNS} \
             FROM contract_positions cp JOIN positions p ON p.id = cp.position_id \
             WHERE cp.contract_id = ANY($1) ORDER BY cp.id"
        );
        let line_rows = sqlx::query(&sql)
            .bind(&ids)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let mut lines: HashMap<i64, Vec<ContractLine>> = HashMap::new();
        for row in &line_rows {
            let owner: i64 = column(row, "contract_id")?;
            lines.entry(owner).or_default().push(ContractLine {
                id: ContractPositionId::new(column(row, "line_id")?),
                position: rows::position(row)?,
                amount: column(row, "amount")?,
            });
        }

        headers
            .iter()
            .map(|row| {
                let id: i64 = column(row, "id")?;
                Ok(ContractDetails {
                    id: ContractId::new(id),
                    created_at: rows::timestamp(row, "created_at")?,
                    accepted: column(row, "accepted")?,
                    customer: rows::customer(row)?,
                    lines: lines.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ContractRepository for PostgresBillingStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<Contract>> {
        let rows = sqlx::query("SELECT id, created_at, customer_id, accepted FROM contracts ORDER BY id")
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error("list_contracts", e))?;
        let contracts = rows.iter().map(contract_header).collect::<StoreResult<Vec<_>>>()?;
        self.attach_contract_positions(contracts).await
    }

    #[instrument(skip(self), err)]
    async fn list_details(&self) -> StoreResult<Vec<ContractDetails>> {
        self.load_contract_details("", None, "list_contract_details").await
    }

    #[instrument(skip(self), fields(contract_id = %id), err)]
    async fn get(&self, id: ContractId) -> StoreResult<Option<Contract>> {
        let row = sqlx::query("SELECT id, created_at, customer_id, accepted FROM contracts WHERE id = $1")
            .bind(id.get())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("get_contract", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let contracts = self.attach_contract_positions(vec![contract_header(&row)?]).await?;
        Ok(contracts.into_iter().next())
    }

    #[instrument(skip(self), fields(contract_id = %id), err)]
    async fn get_details(&self, id: ContractId) -> StoreResult<Option<ContractDetails>> {
        let details = self
            .load_contract_details("WHERE c.id = $1", Some(id.get()), "get_contract_details")
            .await?;
        Ok(details.into_iter().next())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id), err)]
    async fn list_by_customer(&self, customer_id: CustomerId) -> StoreResult<Vec<ContractDetails>> {
        self.load_contract_details(
            "WHERE c.customer_id = $1",
            Some(customer_id.get()),
            "list_contracts_by_customer",
        )
        .await
    }

    #[instrument(
        skip(self, draft),
        fields(customer_id = %draft.customer_id, line_count = draft.lines.len()),
        err
    )]
    async fn create(&self, draft: NewContract) -> StoreResult<ContractId> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let lines = materialize_lines(&mut tx, draft.lines).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO contracts (created_at, customer_id, accepted)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(draft.created_at)
        .bind(draft.customer_id.get())
        .bind(draft.accepted)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_contract", e))?;

        for (position_id, amount) in lines {
            sqlx::query(
                "INSERT INTO contract_positions (contract_id, position_id, amount) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(position_id.get())
            .bind(amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_contract_position", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(ContractId::new(id))
    }

    #[instrument(skip(self, contract), fields(contract_id = %contract.id), err)]
    async fn update(&self, contract: &Contract) -> StoreResult<()> {
        let result = sqlx::query("UPDATE contracts SET customer_id = $2, accepted = $3 WHERE id = $1")
            .bind(contract.id.get())
            .bind(contract.customer_id.get())
            .bind(contract.accepted)
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("update_contract", e))?;

        expect_one(result.rows_affected(), "contracts", contract.id.get())
    }

    #[instrument(skip(self), fields(contract_id = %id), err)]
    async fn delete_lines(&self, id: ContractId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM contract_positions WHERE contract_id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_contract_positions", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(contract_id = %id), err)]
    async fn delete(&self, id: ContractId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_contract", e))?;

        expect_one(result.rows_affected(), "contracts", id.get())
    }

    async fn exists(&self, id: ContractId) -> StoreResult<bool> {
        row_exists(
            self.pool(),
            "SELECT EXISTS (SELECT 1 FROM contracts WHERE id = $1)",
            id.get(),
        )
        .await
    }
}
