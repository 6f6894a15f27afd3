//! Repository contracts, one per aggregate.
//!
//! All traits are object safe so the business layer can hold `Arc<dyn …>`.
//! Methods named `*_details` eager-load the full graph (customer, join records and
//! the positions they reference); the plain variants return foreign keys only.
//!
//! Stores never cascade deletes: a parent with join records cannot be deleted
//! until `delete_lines` has removed them.

use async_trait::async_trait;

use forgebill_catalog::{Position, PositionRequest};
use forgebill_contracts::{Contract, ContractDetails, NewContract};
use forgebill_core::{ContractId, CustomerId, InvoiceId, PositionId, TransactionId};
use forgebill_customers::{Customer, CustomerRequest};
use forgebill_invoicing::{Invoice, InvoiceDetails, NewInvoice};
use forgebill_ledger::{Transaction, TransactionRequest};

use crate::error::StoreResult;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Customer>>;
    async fn get(&self, id: CustomerId) -> StoreResult<Option<Customer>>;
    async fn create(&self, request: CustomerRequest) -> StoreResult<Customer>;
    async fn update(&self, customer: &Customer) -> StoreResult<()>;
    async fn delete(&self, id: CustomerId) -> StoreResult<()>;
    async fn exists(&self, id: CustomerId) -> StoreResult<bool>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Position>>;
    async fn get(&self, id: PositionId) -> StoreResult<Option<Position>>;
    async fn create(&self, request: PositionRequest) -> StoreResult<Position>;
    async fn update(&self, position: &Position) -> StoreResult<()>;
    async fn delete(&self, id: PositionId) -> StoreResult<()>;
    async fn exists(&self, id: PositionId) -> StoreResult<bool>;
    /// Number of contract and invoice join records referencing the position.
    async fn usage_count(&self, id: PositionId) -> StoreResult<u64>;
}

#[async_trait]
pub trait ContractRepository: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Contract>>;
    async fn list_details(&self) -> StoreResult<Vec<ContractDetails>>;
    async fn get(&self, id: ContractId) -> StoreResult<Option<Contract>>;
    async fn get_details(&self, id: ContractId) -> StoreResult<Option<ContractDetails>>;
    async fn list_by_customer(&self, customer_id: CustomerId)
        -> StoreResult<Vec<ContractDetails>>;
    /// Persist inline positions, the contract and its join records atomically.
    async fn create(&self, draft: NewContract) -> StoreResult<ContractId>;
    /// Persist the contract header (join records are not touched).
    async fn update(&self, contract: &Contract) -> StoreResult<()>;
    /// Remove every join record owned by the contract; returns how many were removed.
    async fn delete_lines(&self, id: ContractId) -> StoreResult<u64>;
    async fn delete(&self, id: ContractId) -> StoreResult<()>;
    async fn exists(&self, id: ContractId) -> StoreResult<bool>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Invoice>>;
    async fn list_details(&self) -> StoreResult<Vec<InvoiceDetails>>;
    async fn get(&self, id: InvoiceId) -> StoreResult<Option<Invoice>>;
    async fn get_details(&self, id: InvoiceId) -> StoreResult<Option<InvoiceDetails>>;
    async fn list_by_customer(&self, customer_id: CustomerId)
        -> StoreResult<Vec<InvoiceDetails>>;
    /// Persist inline positions, the invoice and its join records atomically.
    async fn create(&self, draft: NewInvoice) -> StoreResult<InvoiceId>;
    /// Persist the invoice header (join records are not touched).
    async fn update(&self, invoice: &Invoice) -> StoreResult<()>;
    async fn delete_lines(&self, id: InvoiceId) -> StoreResult<u64>;
    async fn delete(&self, id: InvoiceId) -> StoreResult<()>;
    async fn exists(&self, id: InvoiceId) -> StoreResult<bool>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Transaction>>;
    async fn get(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;
    async fn create(&self, request: TransactionRequest) -> StoreResult<Transaction>;
    async fn update(&self, transaction: &Transaction) -> StoreResult<()>;
    async fn delete(&self, id: TransactionId) -> StoreResult<()>;
    async fn exists(&self, id: TransactionId) -> StoreResult<bool>;
}
