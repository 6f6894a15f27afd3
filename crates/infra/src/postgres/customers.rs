use async_trait::async_trait;
use tracing::instrument;

use forgebill_core::CustomerId;
use forgebill_customers::{Customer, CustomerRequest};

use super::rows::{self, CUSTOMER_COLUMNS};
use super::{expect_one, row_exists, PostgresBillingStore};
use crate::error::{map_sqlx_error, StoreResult};
use crate::repository::CustomerRepository;

#[async_trait]
impl CustomerRepository for PostgresBillingStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers cu ORDER BY cu.id");
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error("list_customers", e))?;
        rows.iter().map(rows::customer).collect()
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    async fn get(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers cu WHERE cu.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("get_customer", e))?;
        row.as_ref().map(rows::customer).transpose()
    }

    #[instrument(skip(self, request), err)]
    async fn create(&self, request: CustomerRequest) -> StoreResult<Customer> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO customers (first_name, last_name, street, postal_code, city, tax_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.street)
        .bind(&request.postal_code)
        .bind(&request.city)
        .bind(&request.tax_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_sqlx_error("create_customer", e))?;

        Ok(Customer::from_request(CustomerId::new(id), request))
    }

    #[instrument(skip(self, customer), fields(customer_id = %customer.id), err)]
    async fn update(&self, customer: &Customer) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET first_name = $2, last_name = $3, street = $4, postal_code = $5, city = $6, tax_id = $7
            WHERE id = $1
            "#,
        )
        .bind(customer.id.get())
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.street)
        .bind(&customer.postal_code)
        .bind(&customer.city)
        .bind(&customer.tax_id)
        .execute(self.pool())
        .await
        .map_err(|e| map_sqlx_error("update_customer", e))?;

        expect_one(result.rows_affected(), "customers", customer.id.get())
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    async fn delete(&self, id: CustomerId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_customer", e))?;

        expect_one(result.rows_affected(), "customers", id.get())
    }

    async fn exists(&self, id: CustomerId) -> StoreResult<bool> {
        row_exists(
            self.pool(),
            "SELECT EXISTS (SELECT 1 FROM customers WHERE id = $1)",
            id.get(),
        )
        .await
    }
}
