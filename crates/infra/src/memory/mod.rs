//! In-memory billing store for tests/dev.

pub mod store;

pub use store::InMemoryBillingStore;
