//! Catalog domain module: positions (price-list items) and line-item resolution.
//!
//! Positions are shared by contracts and invoices through join records; neither
//! aggregate owns them. Line items arriving with a contract or invoice either point
//! at an existing position or carry the data for a new one; [`LineItemRequest::resolve`]
//! turns that into a [`PositionRef`] before anything is written.

pub mod line_item;
pub mod position;

pub use line_item::{resolve_all, LineItem, LineItemRequest, PositionRef};
pub use position::{Position, PositionRequest};
