use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use forgebill_catalog::{LineItem, Position, PositionRef, PositionRequest};
use forgebill_contracts::{Contract, ContractDetails, ContractLine, ContractPosition, NewContract};
use forgebill_core::{
    ContractId, ContractPositionId, CustomerId, InvoiceId, InvoicePositionId, PositionId,
    TransactionId,
};
use forgebill_customers::{Customer, CustomerRequest};
use forgebill_invoicing::{
    Invoice, InvoiceDetails, InvoiceKind, InvoiceLine, InvoicePosition, NewInvoice,
};
use forgebill_ledger::{Transaction, TransactionRequest};

use crate::error::{StoreError, StoreResult};
use crate::repository::{
    ContractRepository, CustomerRepository, InvoiceRepository, PositionRepository,
    TransactionRepository,
};

#[derive(Debug, Clone)]
struct ContractRow {
    id: ContractId,
    created_at: DateTime<Utc>,
    customer_id: CustomerId,
    accepted: bool,
}

#[derive(Debug, Clone)]
struct InvoiceRow {
    id: InvoiceId,
    created_at: DateTime<Utc>,
    customer_id: CustomerId,
    start: DateTime<Utc>,
    finish: DateTime<Utc>,
    deposit: Decimal,
    deposit_paid_at: Option<DateTime<Utc>>,
    kind: InvoiceKind,
}

/// Per-table key sequences; keys are never reused.
#[derive(Debug, Default)]
struct Sequences {
    customer: i64,
    position: i64,
    contract: i64,
    contract_position: i64,
    invoice: i64,
    invoice_position: i64,
    transaction: i64,
}

fn next_key(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    positions: BTreeMap<PositionId, Position>,
    contracts: BTreeMap<ContractId, ContractRow>,
    contract_positions: BTreeMap<ContractPositionId, ContractPosition>,
    invoices: BTreeMap<InvoiceId, InvoiceRow>,
    invoice_positions: BTreeMap<InvoicePositionId, InvoicePosition>,
    transactions: BTreeMap<TransactionId, Transaction>,
    seq: Sequences,
}

impl Tables {
    fn customer(&self, id: CustomerId) -> StoreResult<Customer> {
        self.customers.get(&id).cloned().ok_or_else(|| {
            StoreError::Decode(format!("dangling reference to customer {id}"))
        })
    }

    fn position(&self, id: PositionId) -> StoreResult<Position> {
        self.positions.get(&id).cloned().ok_or_else(|| {
            StoreError::Decode(format!("dangling reference to position {id}"))
        })
    }

    /// Foreign-key checks for a draft, run before anything is written.
    fn check_draft(&self, customer_id: CustomerId, lines: &[LineItem]) -> StoreResult<()> {
        if !self.customers.contains_key(&customer_id) {
            return Err(StoreError::Constraint(format!(
                "customer {customer_id} is not present"
            )));
        }
        for id in lines.iter().filter_map(LineItem::existing_position) {
            if !self.positions.contains_key(&id) {
                return Err(StoreError::Constraint(format!("position {id} is not present")));
            }
        }
        Ok(())
    }

    fn insert_position(&mut self, request: PositionRequest) -> Position {
        let id = PositionId::new(next_key(&mut self.seq.position));
        let position = Position::from_request(id, request);
        self.positions.insert(id, position.clone());
        position
    }

    /// Resolve every line to a position id, inserting inline positions.
    fn materialize_lines(&mut self, lines: Vec<LineItem>) -> Vec<(PositionId, Decimal)> {
        lines
            .into_iter()
            .map(|line| {
                let position_id = match line.position {
                    PositionRef::Existing(id) => id,
                    PositionRef::New(request) => self.insert_position(request).id,
                };
                (position_id, line.amount)
            })
            .collect()
    }

    fn contract_positions(&self, id: ContractId) -> Vec<ContractPosition> {
        self.contract_positions
            .values()
            .filter(|cp| cp.contract_id == id)
            .cloned()
            .collect()
    }

    fn invoice_positions(&self, id: InvoiceId) -> Vec<InvoicePosition> {
        self.invoice_positions
            .values()
            .filter(|ip| ip.invoice_id == id)
            .cloned()
            .collect()
    }

    fn contract(&self, row: &ContractRow) -> Contract {
        Contract {
            id: row.id,
            created_at: row.created_at,
            customer_id: row.customer_id,
            accepted: row.accepted,
            positions: self.contract_positions(row.id),
        }
    }

    fn contract_details(&self, row: &ContractRow) -> StoreResult<ContractDetails> {
        let lines = self
            .contract_positions(row.id)
            .into_iter()
            .map(|cp| {
                Ok(ContractLine {
                    id: cp.id,
                    position: self.position(cp.position_id)?,
                    amount: cp.amount,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(ContractDetails {
            id: row.id,
            created_at: row.created_at,
            accepted: row.accepted,
            customer: self.customer(row.customer_id)?,
            lines,
        })
    }

    fn invoice(&self, row: &InvoiceRow) -> Invoice {
        Invoice {
            id: row.id,
            created_at: row.created_at,
            customer_id: row.customer_id,
            start: row.start,
            finish: row.finish,
            deposit: row.deposit,
            deposit_paid_at: row.deposit_paid_at,
            kind: row.kind,
            positions: self.invoice_positions(row.id),
        }
    }

    fn invoice_details(&self, row: &InvoiceRow) -> StoreResult<InvoiceDetails> {
        let lines = self
            .invoice_positions(row.id)
            .into_iter()
            .map(|ip| {
                Ok(InvoiceLine {
                    id: ip.id,
                    position: self.position(ip.position_id)?,
                    amount: ip.amount,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(InvoiceDetails {
            id: row.id,
            created_at: row.created_at,
            customer: self.customer(row.customer_id)?,
            start: row.start,
            finish: row.finish,
            deposit: row.deposit,
            deposit_paid_at: row.deposit_paid_at,
            kind: row.kind,
            lines,
        })
    }
}

/// In-memory store implementing every repository.
///
/// All tables live behind one lock, so a contract or invoice draft (inline
/// positions + parent + join records) is written in a single critical section.
/// Foreign keys are enforced like the Postgres schema does: no cascades.
#[derive(Debug, Default)]
pub struct InMemoryBillingStore {
    tables: RwLock<Tables>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    /// Join records currently referencing a contract (orphans included).
    pub fn contract_line_count(&self, id: ContractId) -> StoreResult<usize> {
        Ok(self.read()?.contract_positions(id).len())
    }

    /// Join records currently referencing an invoice (orphans included).
    pub fn invoice_line_count(&self, id: InvoiceId) -> StoreResult<usize> {
        Ok(self.read()?.invoice_positions(id).len())
    }
}

#[async_trait]
impl CustomerRepository for InMemoryBillingStore {
    async fn list(&self) -> StoreResult<Vec<Customer>> {
        Ok(self.read()?.customers.values().cloned().collect())
    }

    async fn get(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        Ok(self.read()?.customers.get(&id).cloned())
    }

    async fn create(&self, request: CustomerRequest) -> StoreResult<Customer> {
        let mut tables = self.write()?;
        let id = CustomerId::new(next_key(&mut tables.seq.customer));
        let customer = Customer::from_request(id, request);
        tables.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn update(&self, customer: &Customer) -> StoreResult<()> {
        let mut tables = self.write()?;
        match tables.customers.get_mut(&customer.id) {
            Some(slot) => {
                *slot = customer.clone();
                Ok(())
            }
            None => Err(StoreError::RowMissing {
                table: "customers",
                id: customer.id.get(),
            }),
        }
    }

    async fn delete(&self, id: CustomerId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.contracts.values().any(|c| c.customer_id == id)
            || tables.invoices.values().any(|i| i.customer_id == id)
        {
            return Err(StoreError::Constraint(format!(
                "customer {id} is still referenced"
            )));
        }
        tables
            .customers
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowMissing {
                table: "customers",
                id: id.get(),
            })
    }

    async fn exists(&self, id: CustomerId) -> StoreResult<bool> {
        Ok(self.read()?.customers.contains_key(&id))
    }
}

#[async_trait]
impl PositionRepository for InMemoryBillingStore {
    async fn list(&self) -> StoreResult<Vec<Position>> {
        Ok(self.read()?.positions.values().cloned().collect())
    }

    async fn get(&self, id: PositionId) -> StoreResult<Option<Position>> {
        Ok(self.read()?.positions.get(&id).cloned())
    }

    async fn create(&self, request: PositionRequest) -> StoreResult<Position> {
        Ok(self.write()?.insert_position(request))
    }

    async fn update(&self, position: &Position) -> StoreResult<()> {
        let mut tables = self.write()?;
        match tables.positions.get_mut(&position.id) {
            Some(slot) => {
                *slot = position.clone();
                Ok(())
            }
            None => Err(StoreError::RowMissing {
                table: "positions",
                id: position.id.get(),
            }),
        }
    }

    async fn delete(&self, id: PositionId) -> StoreResult<()> {
        let mut tables = self.write()?;
        let referenced = tables.contract_positions.values().any(|cp| cp.position_id == id)
            || tables.invoice_positions.values().any(|ip| ip.position_id == id);
        if referenced {
            return Err(StoreError::Constraint(format!(
                "position {id} is still referenced"
            )));
        }
        tables
            .positions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowMissing {
                table: "positions",
                id: id.get(),
            })
    }

    async fn exists(&self, id: PositionId) -> StoreResult<bool> {
        Ok(self.read()?.positions.contains_key(&id))
    }

    async fn usage_count(&self, id: PositionId) -> StoreResult<u64> {
        let tables = self.read()?;
        let in_contracts = tables
            .contract_positions
            .values()
            .filter(|cp| cp.position_id == id)
            .count();
        let in_invoices = tables
            .invoice_positions
            .values()
            .filter(|ip| ip.position_id == id)
            .count();
        Ok((in_contracts + in_invoices) as u64)
    }
}

#[async_trait]
impl ContractRepository for InMemoryBillingStore {
    async fn list(&self) -> StoreResult<Vec<Contract>> {
        let tables = self.read()?;
        Ok(tables.contracts.values().map(|row| tables.contract(row)).collect())
    }

    async fn list_details(&self) -> StoreResult<Vec<ContractDetails>> {
        let tables = self.read()?;
        tables
            .contracts
            .values()
            .map(|row| tables.contract_details(row))
            .collect()
    }

    async fn get(&self, id: ContractId) -> StoreResult<Option<Contract>> {
        let tables = self.read()?;
        Ok(tables.contracts.get(&id).map(|row| tables.contract(row)))
    }

    async fn get_details(&self, id: ContractId) -> StoreResult<Option<ContractDetails>> {
        let tables = self.read()?;
        tables
            .contracts
            .get(&id)
            .map(|row| tables.contract_details(row))
            .transpose()
    }

    async fn list_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> StoreResult<Vec<ContractDetails>> {
        let tables = self.read()?;
        tables
            .contracts
            .values()
            .filter(|row| row.customer_id == customer_id)
            .map(|row| tables.contract_details(row))
            .collect()
    }

    async fn create(&self, draft: NewContract) -> StoreResult<ContractId> {
        let mut tables = self.write()?;
        tables.check_draft(draft.customer_id, &draft.lines)?;

        let lines = tables.materialize_lines(draft.lines);
        let id = ContractId::new(next_key(&mut tables.seq.contract));
        tables.contracts.insert(
            id,
            ContractRow {
                id,
                created_at: draft.created_at,
                customer_id: draft.customer_id,
                accepted: draft.accepted,
            },
        );
        for (position_id, amount) in lines {
            let line_id = ContractPositionId::new(next_key(&mut tables.seq.contract_position));
            tables.contract_positions.insert(
                line_id,
                ContractPosition {
                    id: line_id,
                    contract_id: id,
                    position_id,
                    amount,
                },
            );
        }
        Ok(id)
    }

    async fn update(&self, contract: &Contract) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.customers.contains_key(&contract.customer_id) {
            return Err(StoreError::Constraint(format!(
                "customer {} is not present",
                contract.customer_id
            )));
        }
        match tables.contracts.get_mut(&contract.id) {
            Some(row) => {
                row.customer_id = contract.customer_id;
                row.accepted = contract.accepted;
                Ok(())
            }
            None => Err(StoreError::RowMissing {
                table: "contracts",
                id: contract.id.get(),
            }),
        }
    }

    async fn delete_lines(&self, id: ContractId) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let before = tables.contract_positions.len();
        tables.contract_positions.retain(|_, cp| cp.contract_id != id);
        Ok((before - tables.contract_positions.len()) as u64)
    }

    async fn delete(&self, id: ContractId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.contract_positions.values().any(|cp| cp.contract_id == id) {
            return Err(StoreError::Constraint(format!(
                "contract {id} still owns join records"
            )));
        }
        tables
            .contracts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowMissing {
                table: "contracts",
                id: id.get(),
            })
    }

    async fn exists(&self, id: ContractId) -> StoreResult<bool> {
        Ok(self.read()?.contracts.contains_key(&id))
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryBillingStore {
    async fn list(&self) -> StoreResult<Vec<Invoice>> {
        let tables = self.read()?;
        Ok(tables.invoices.values().map(|row| tables.invoice(row)).collect())
    }

    async fn list_details(&self) -> StoreResult<Vec<InvoiceDetails>> {
        let tables = self.read()?;
        tables
            .invoices
            .values()
            .map(|row| tables.invoice_details(row))
            .collect()
    }

    async fn get(&self, id: InvoiceId) -> StoreResult<Option<Invoice>> {
        let tables = self.read()?;
        Ok(tables.invoices.get(&id).map(|row| tables.invoice(row)))
    }

    async fn get_details(&self, id: InvoiceId) -> StoreResult<Option<InvoiceDetails>> {
        let tables = self.read()?;
        tables
            .invoices
            .get(&id)
            .map(|row| tables.invoice_details(row))
            .transpose()
    }

    async fn list_by_customer(&self, customer_id: CustomerId) -> StoreResult<Vec<InvoiceDetails>> {
        let tables = self.read()?;
        tables
            .invoices
            .values()
            .filter(|row| row.customer_id == customer_id)
            .map(|row| tables.invoice_details(row))
            .collect()
    }

    async fn create(&self, draft: NewInvoice) -> StoreResult<InvoiceId> {
        let mut tables = self.write()?;
        tables.check_draft(draft.customer_id, &draft.lines)?;

        let lines = tables.materialize_lines(draft.lines);
        let id = InvoiceId::new(next_key(&mut tables.seq.invoice));
        tables.invoices.insert(
            id,
            InvoiceRow {
                id,
                created_at: draft.created_at,
                customer_id: draft.customer_id,
                start: draft.start,
                finish: draft.finish,
                deposit: draft.deposit,
                deposit_paid_at: draft.deposit_paid_at,
                kind: draft.kind,
            },
        );
        for (position_id, amount) in lines {
            let line_id = InvoicePositionId::new(next_key(&mut tables.seq.invoice_position));
            tables.invoice_positions.insert(
                line_id,
                InvoicePosition {
                    id: line_id,
                    invoice_id: id,
                    position_id,
                    amount,
                },
            );
        }
        Ok(id)
    }

    async fn update(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.customers.contains_key(&invoice.customer_id) {
            return Err(StoreError::Constraint(format!(
                "customer {} is not present",
                invoice.customer_id
            )));
        }
        match tables.invoices.get_mut(&invoice.id) {
            Some(row) => {
                row.customer_id = invoice.customer_id;
                row.start = invoice.start;
                row.finish = invoice.finish;
                row.deposit = invoice.deposit;
                row.deposit_paid_at = invoice.deposit_paid_at;
                row.kind = invoice.kind;
                Ok(())
            }
            None => Err(StoreError::RowMissing {
                table: "invoices",
                id: invoice.id.get(),
            }),
        }
    }

    async fn delete_lines(&self, id: InvoiceId) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let before = tables.invoice_positions.len();
        tables.invoice_positions.retain(|_, ip| ip.invoice_id != id);
        Ok((before - tables.invoice_positions.len()) as u64)
    }

    async fn delete(&self, id: InvoiceId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.invoice_positions.values().any(|ip| ip.invoice_id == id) {
            return Err(StoreError::Constraint(format!(
                "invoice {id} still owns join records"
            )));
        }
        tables
            .invoices
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowMissing {
                table: "invoices",
                id: id.get(),
            })
    }

    async fn exists(&self, id: InvoiceId) -> StoreResult<bool> {
        Ok(self.read()?.invoices.contains_key(&id))
    }
}

#[async_trait]
impl TransactionRepository for InMemoryBillingStore {
    async fn list(&self) -> StoreResult<Vec<Transaction>> {
        Ok(self.read()?.transactions.values().cloned().collect())
    }

    async fn get(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self.read()?.transactions.get(&id).cloned())
    }

    async fn create(&self, request: TransactionRequest) -> StoreResult<Transaction> {
        let mut tables = self.write()?;
        let id = TransactionId::new(next_key(&mut tables.seq.transaction));
        let transaction = Transaction::from_request(id, request);
        tables.transactions.insert(id, transaction.clone());
        Ok(transaction)
    }

    async fn update(&self, transaction: &Transaction) -> StoreResult<()> {
        let mut tables = self.write()?;
        match tables.transactions.get_mut(&transaction.id) {
            Some(slot) => {
                *slot = transaction.clone();
                Ok(())
            }
            None => Err(StoreError::RowMissing {
                table: "transactions",
                id: transaction.id.get(),
            }),
        }
    }

    async fn delete(&self, id: TransactionId) -> StoreResult<()> {
        self.write()?
            .transactions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowMissing {
                table: "transactions",
                id: id.get(),
            })
    }

    async fn exists(&self, id: TransactionId) -> StoreResult<bool> {
        Ok(self.read()?.transactions.contains_key(&id))
    }
}
