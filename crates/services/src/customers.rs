use std::sync::Arc;

use tracing::{info, instrument, warn};

use forgebill_core::CustomerId;
use forgebill_customers::{Customer, CustomerRequest};
use forgebill_infra::{ContractRepository, CustomerRepository, InvoiceRepository, StoreError};

use crate::dto::{contract_responses, invoice_responses, ContractResponse, InvoiceResponse};
use crate::error::{missing, ServiceError, ServiceResult};

/// Customer operations plus the read compositions over contracts and invoices.
#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
    contracts: Arc<dyn ContractRepository>,
    invoices: Arc<dyn InvoiceRepository>,
}

impl CustomerService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        contracts: Arc<dyn ContractRepository>,
        invoices: Arc<dyn InvoiceRepository>,
    ) -> Self {
        Self {
            customers,
            contracts,
            invoices,
        }
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self) -> ServiceResult<Vec<Customer>> {
        Ok(self.customers.list().await?)
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    pub async fn get(&self, id: CustomerId) -> ServiceResult<Customer> {
        self.customers
            .get(id)
            .await?
            .ok_or_else(|| missing::<Customer>(id))
    }

    #[instrument(skip(self, request), err)]
    pub async fn create(&self, request: CustomerRequest) -> ServiceResult<Customer> {
        let request = request.normalized();
        request.validate()?;

        let customer = self.customers.create(request).await?;
        info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    #[instrument(skip(self, request), fields(customer_id = %id), err)]
    pub async fn update(&self, id: CustomerId, request: CustomerRequest) -> ServiceResult<Customer> {
        let request = request.normalized();
        request.validate()?;

        let mut customer = self.get(id).await?;
        customer.apply(request);
        self.customers.update(&customer).await?;
        Ok(customer)
    }

    /// Delete a customer that no contract or invoice references.
    #[instrument(skip(self), fields(customer_id = %id), err)]
    pub async fn delete(&self, id: CustomerId) -> ServiceResult<()> {
        if !self.customers.exists(id).await? {
            return Err(missing::<Customer>(id));
        }

        match self.customers.delete(id).await {
            Ok(()) => {
                info!("customer deleted");
                Ok(())
            }
            Err(StoreError::Constraint(detail)) => {
                warn!(%detail, "customer delete rejected");
                Err(ServiceError::conflict(format!(
                    "customer {id} is referenced by contracts or invoices"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Contracts of an existing customer; empty for a customer without any.
    #[instrument(skip(self), fields(customer_id = %id), err)]
    pub async fn contracts_for(&self, id: CustomerId) -> ServiceResult<Vec<ContractResponse>> {
        if !self.customers.exists(id).await? {
            return Err(missing::<Customer>(id));
        }
        let details = self.contracts.list_by_customer(id).await?;
        Ok(contract_responses(details)?)
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    pub async fn invoices_for(&self, id: CustomerId) -> ServiceResult<Vec<InvoiceResponse>> {
        if !self.customers.exists(id).await? {
            return Err(missing::<Customer>(id));
        }
        let details = self.invoices.list_by_customer(id).await?;
        Ok(invoice_responses(details)?)
    }
}
