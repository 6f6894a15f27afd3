use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use forgebill_core::{CustomerId, InvoiceId};
use forgebill_customers::Customer;
use forgebill_infra::{CustomerRepository, InvoiceRepository, PositionRepository};
use forgebill_invoicing::{Invoice, InvoiceRequest, NewInvoice};

use crate::dto::{invoice_responses, InvoiceResponse};
use crate::error::{missing, ServiceResult};
use crate::lines::resolve_line_items;

#[derive(Clone)]
pub struct InvoiceService {
    invoices: Arc<dyn InvoiceRepository>,
    customers: Arc<dyn CustomerRepository>,
    positions: Arc<dyn PositionRepository>,
}

impl InvoiceService {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        customers: Arc<dyn CustomerRepository>,
        positions: Arc<dyn PositionRepository>,
    ) -> Self {
        Self {
            invoices,
            customers,
            positions,
        }
    }

    async fn ensure_customer(&self, id: CustomerId) -> ServiceResult<()> {
        if self.customers.exists(id).await? {
            Ok(())
        } else {
            Err(missing::<Customer>(id))
        }
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self) -> ServiceResult<Vec<InvoiceResponse>> {
        let details = self.invoices.list_details().await?;
        Ok(invoice_responses(details)?)
    }

    #[instrument(skip(self), fields(invoice_id = %id), err)]
    pub async fn get(&self, id: InvoiceId) -> ServiceResult<InvoiceResponse> {
        let details = self
            .invoices
            .get_details(id)
            .await?
            .ok_or_else(|| missing::<Invoice>(id))?;
        Ok(InvoiceResponse::from_details(details)?)
    }

    #[instrument(
        skip(self, request),
        fields(customer_id = %request.customer_id, kind = request.kind.as_str(), line_count = request.positions.len()),
        err
    )]
    pub async fn create(&self, request: InvoiceRequest) -> ServiceResult<InvoiceResponse> {
        request.validate_header()?;
        self.ensure_customer(request.customer_id).await?;
        let lines = resolve_line_items(self.positions.as_ref(), &request.positions).await?;

        let id = self
            .invoices
            .create(NewInvoice {
                customer_id: request.customer_id,
                created_at: Utc::now(),
                start: request.start,
                finish: request.finish,
                deposit: request.deposit,
                deposit_paid_at: request.deposit_paid_at,
                kind: request.kind,
                lines,
            })
            .await?;
        info!(invoice_id = %id, "invoice created");

        self.get(id).await
    }

    /// Replace the header fields; `request.positions` is ignored.
    #[instrument(skip(self, request), fields(invoice_id = %id), err)]
    pub async fn update(&self, id: InvoiceId, request: InvoiceRequest) -> ServiceResult<InvoiceResponse> {
        let mut invoice = self
            .invoices
            .get(id)
            .await?
            .ok_or_else(|| missing::<Invoice>(id))?;
        request.validate_header()?;
        if invoice.customer_id != request.customer_id {
            self.ensure_customer(request.customer_id).await?;
        }

        invoice.apply(&request);
        self.invoices.update(&invoice).await?;
        self.get(id).await
    }

    /// Remove the invoice's lines, then the invoice.
    #[instrument(skip(self), fields(invoice_id = %id), err)]
    pub async fn delete(&self, id: InvoiceId) -> ServiceResult<()> {
        if !self.invoices.exists(id).await? {
            return Err(missing::<Invoice>(id));
        }

        let removed = self.invoices.delete_lines(id).await?;
        self.invoices.delete(id).await?;
        info!(removed_lines = removed, "invoice deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id), err)]
    pub async fn get_by_customer(&self, customer_id: CustomerId) -> ServiceResult<Vec<InvoiceResponse>> {
        self.ensure_customer(customer_id).await?;
        let details = self.invoices.list_by_customer(customer_id).await?;
        Ok(invoice_responses(details)?)
    }
}
