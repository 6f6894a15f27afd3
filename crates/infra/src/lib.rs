//! Infrastructure layer: repositories, storage backends and store configuration.
//!
//! The business layer talks to storage only through the traits in [`repository`].
//! Two backends implement all of them:
//! - [`memory::InMemoryBillingStore`] for tests/dev
//! - [`postgres::PostgresBillingStore`] backed by a sqlx `PgPool`

pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use config::{ConfigError, StoreBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBillingStore;
pub use postgres::PostgresBillingStore;
pub use repository::{
    ContractRepository, CustomerRepository, InvoiceRepository, PositionRepository,
    TransactionRepository,
};
