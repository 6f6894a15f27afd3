//! Invoicing domain module.
//!
//! Invoices own their invoice/position join records, compute totals from live
//! position prices, and can be drafted from an existing contract
//! (see [`conversion::draft_from_contract`]). Pure domain logic only.

pub mod conversion;
pub mod invoice;

pub use conversion::draft_from_contract;
pub use invoice::{
    Invoice, InvoiceDetails, InvoiceKind, InvoiceLine, InvoicePosition, InvoiceRequest,
    NewInvoice,
};
