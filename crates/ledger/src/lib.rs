//! Ledger domain module: standalone money transactions.
//!
//! Transactions are not linked to customers, contracts or invoices.

pub mod transaction;

pub use transaction::{balance, PaymentMedium, Transaction, TransactionKind, TransactionRequest};
