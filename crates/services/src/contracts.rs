use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use forgebill_contracts::{Contract, ContractRequest, ContractUpdate, NewContract};
use forgebill_core::ContractId;
use forgebill_customers::Customer;
use forgebill_infra::{ContractRepository, CustomerRepository, PositionRepository};
use forgebill_invoicing::{draft_from_contract, InvoiceRequest};

use crate::dto::{contract_responses, ContractResponse};
use crate::error::{missing, ServiceResult};
use crate::lines::resolve_line_items;

#[derive(Clone)]
pub struct ContractService {
    contracts: Arc<dyn ContractRepository>,
    customers: Arc<dyn CustomerRepository>,
    positions: Arc<dyn PositionRepository>,
}

impl ContractService {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        customers: Arc<dyn CustomerRepository>,
        positions: Arc<dyn PositionRepository>,
    ) -> Self {
        Self {
            contracts,
            customers,
            positions,
        }
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self) -> ServiceResult<Vec<ContractResponse>> {
        let details = self.contracts.list_details().await?;
        Ok(contract_responses(details)?)
    }

    #[instrument(skip(self), fields(contract_id = %id), err)]
    pub async fn get(&self, id: ContractId) -> ServiceResult<ContractResponse> {
        let details = self
            .contracts
            .get_details(id)
            .await?
            .ok_or_else(|| missing::<Contract>(id))?;
        Ok(ContractResponse::from_details(details)?)
    }

    /// Create a contract; inline positions, the contract and its lines are
    /// written in one store operation.
    #[instrument(
        skip(self, request),
        fields(customer_id = %request.customer_id, line_count = request.positions.len()),
        err
    )]
    pub async fn create(&self, request: ContractRequest) -> ServiceResult<ContractResponse> {
        if !self.customers.exists(request.customer_id).await? {
            return Err(missing::<Customer>(request.customer_id));
        }
        let lines = resolve_line_items(self.positions.as_ref(), &request.positions).await?;

        let id = self
            .contracts
            .create(NewContract {
                customer_id: request.customer_id,
                created_at: Utc::now(),
                accepted: false,
                lines,
            })
            .await?;
        info!(contract_id = %id, "contract created");

        self.get(id).await
    }

    /// Only the accepted flag is mutable.
    #[instrument(skip(self), fields(contract_id = %id), err)]
    pub async fn update(&self, id: ContractId, update: ContractUpdate) -> ServiceResult<ContractResponse> {
        let mut contract = self
            .contracts
            .get(id)
            .await?
            .ok_or_else(|| missing::<Contract>(id))?;

        contract.accepted = update.accepted;
        self.contracts.update(&contract).await?;
        self.get(id).await
    }

    /// Remove the contract's lines, then the contract.
    #[instrument(skip(self), fields(contract_id = %id), err)]
    pub async fn delete(&self, id: ContractId) -> ServiceResult<()> {
        if !self.contracts.exists(id).await? {
            return Err(missing::<Contract>(id));
        }

        let removed = self.contracts.delete_lines(id).await?;
        self.contracts.delete(id).await?;
        info!(removed_lines = removed, "contract deleted");
        Ok(())
    }

    /// Build an invoice payload mirroring the contract's lines. Nothing is written.
    #[instrument(skip(self), fields(contract_id = %id), err)]
    pub async fn convert_to_invoice_draft(&self, id: ContractId) -> ServiceResult<InvoiceRequest> {
        let details = self
            .contracts
            .get_details(id)
            .await?
            .ok_or_else(|| missing::<Contract>(id))?;
        Ok(draft_from_contract(&details, Utc::now()))
    }
}
