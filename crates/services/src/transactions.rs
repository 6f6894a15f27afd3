use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use forgebill_core::TransactionId;
use forgebill_infra::TransactionRepository;
use forgebill_ledger::{balance, Transaction, TransactionRequest};

use crate::error::{missing, ServiceResult};

#[derive(Clone)]
pub struct TransactionService {
    transactions: Arc<dyn TransactionRepository>,
}

impl TransactionService {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self) -> ServiceResult<Vec<Transaction>> {
        Ok(self.transactions.list().await?)
    }

    #[instrument(skip(self), fields(transaction_id = %id), err)]
    pub async fn get(&self, id: TransactionId) -> ServiceResult<Transaction> {
        self.transactions
            .get(id)
            .await?
            .ok_or_else(|| missing::<Transaction>(id))
    }

    #[instrument(skip(self, request), err)]
    pub async fn create(&self, request: TransactionRequest) -> ServiceResult<Transaction> {
        let request = request.normalized();
        request.validate()?;

        let transaction = self.transactions.create(request).await?;
        info!(transaction_id = %transaction.id, kind = transaction.kind.as_str(), "transaction booked");
        Ok(transaction)
    }

    #[instrument(skip(self, request), fields(transaction_id = %id), err)]
    pub async fn update(&self, id: TransactionId, request: TransactionRequest) -> ServiceResult<Transaction> {
        let request = request.normalized();
        request.validate()?;

        let mut transaction = self.get(id).await?;
        transaction.apply(request);
        self.transactions.update(&transaction).await?;
        Ok(transaction)
    }

    #[instrument(skip(self), fields(transaction_id = %id), err)]
    pub async fn delete(&self, id: TransactionId) -> ServiceResult<()> {
        if !self.transactions.exists(id).await? {
            return Err(missing::<Transaction>(id));
        }
        self.transactions.delete(id).await?;
        info!("transaction deleted");
        Ok(())
    }

    /// Sum of signed amounts over every booked transaction.
    #[instrument(skip(self), err)]
    pub async fn balance(&self) -> ServiceResult<Decimal> {
        let transactions = self.transactions.list().await?;
        Ok(balance(&transactions)?)
    }
}
