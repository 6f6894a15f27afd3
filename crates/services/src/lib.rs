//! Business logic layer: one service per aggregate over the repository traits.
//!
//! Services validate requests, check referenced records exist before writing,
//! delete children before parents and map hydrated records to response DTOs.

pub mod contracts;
pub mod customers;
pub mod dto;
pub mod error;
mod lines;
pub mod invoices;
pub mod positions;
pub mod transactions;

use std::sync::Arc;

use tracing::{info, instrument};

use forgebill_core::ContractId;
use forgebill_infra::{
    ContractRepository, CustomerRepository, InMemoryBillingStore, InvoiceRepository,
    PositionRepository, PostgresBillingStore, StoreBackend, StoreConfig, TransactionRepository,
};

pub use contracts::ContractService;
pub use customers::CustomerService;
pub use dto::{ContractResponse, InvoiceResponse, LineResponse};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use invoices::InvoiceService;
pub use positions::PositionService;
pub use transactions::TransactionService;

/// All services wired against one store.
#[derive(Clone)]
pub struct BillingServices {
    pub customers: CustomerService,
    pub positions: PositionService,
    pub contracts: ContractService,
    pub invoices: InvoiceService,
    pub transactions: TransactionService,
}

impl BillingServices {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: CustomerRepository
            + PositionRepository
            + ContractRepository
            + InvoiceRepository
            + TransactionRepository
            + 'static,
    {
        let customers: Arc<dyn CustomerRepository> = store.clone();
        let positions: Arc<dyn PositionRepository> = store.clone();
        let contracts: Arc<dyn ContractRepository> = store.clone();
        let invoices: Arc<dyn InvoiceRepository> = store.clone();
        let transactions: Arc<dyn TransactionRepository> = store;

        Self {
            customers: CustomerService::new(customers.clone(), contracts.clone(), invoices.clone()),
            positions: PositionService::new(positions.clone()),
            contracts: ContractService::new(contracts, customers.clone(), positions.clone()),
            invoices: InvoiceService::new(invoices, customers, positions),
            transactions: TransactionService::new(transactions),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBillingStore::new()))
    }

    /// Draft an invoice from a contract and create it through the normal path.
    #[instrument(skip(self), fields(contract_id = %contract_id), err)]
    pub async fn invoice_contract(&self, contract_id: ContractId) -> ServiceResult<InvoiceResponse> {
        let draft = self.contracts.convert_to_invoice_draft(contract_id).await?;
        let invoice = self.invoices.create(draft).await?;
        info!(invoice_id = %invoice.id, "contract invoiced");
        Ok(invoice)
    }
}

/// Wire services against the configured backend. Postgres gets its schema applied.
pub async fn build_services(config: &StoreConfig) -> ServiceResult<BillingServices> {
    match &config.backend {
        StoreBackend::InMemory => Ok(BillingServices::in_memory()),
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresBillingStore::connect(database_url, *max_connections).await?;
            store.apply_schema().await?;
            Ok(BillingServices::new(Arc::new(store)))
        }
    }
}
