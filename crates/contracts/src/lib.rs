//! Contracts domain module.
//!
//! A contract belongs to one customer and exclusively owns its contract/position
//! join records. Positions are referenced, never owned.

pub mod contract;

pub use contract::{
    Contract, ContractDetails, ContractLine, ContractPosition, ContractRequest, ContractUpdate,
    NewContract,
};
