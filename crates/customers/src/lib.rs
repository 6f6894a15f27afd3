//! Customers domain module.
//!
//! Customers are referenced by contracts and invoices; this crate only holds the
//! record and the request validation (no IO, no storage).

pub mod customer;

pub use customer::{Customer, CustomerRequest};
