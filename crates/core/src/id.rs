//! Strongly-typed identifiers used across the domain.
//!
//! Every record is keyed by a positive 64-bit integer assigned by the store.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a customer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(i64);

/// Identifier of a catalog position (price-list item).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(i64);

/// Identifier of a contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(i64);

/// Identifier of a contract/position join record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractPositionId(i64);

/// Identifier of an invoice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(i64);

/// Identifier of an invoice/position join record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoicePositionId(i64);

/// Identifier of a ledger transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

macro_rules! impl_record_id {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw store key.
            ///
            /// Stores only ever hand out positive keys; use [`Self::parse_positive`]
            /// for untrusted input.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Accept only strictly positive raw values.
            pub fn parse_positive(raw: i64) -> Result<Self, DomainError> {
                if raw > 0 {
                    Ok(Self(raw))
                } else {
                    Err(DomainError::invalid_id(format!(
                        "{}: expected a positive value, got {}",
                        $name, raw
                    )))
                }
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = i64::from_str(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Self::parse_positive(raw)
            }
        }
    };
}

impl_record_id!(CustomerId, "CustomerId");
impl_record_id!(PositionId, "PositionId");
impl_record_id!(ContractId, "ContractId");
impl_record_id!(ContractPositionId, "ContractPositionId");
impl_record_id!(InvoiceId, "InvoiceId");
impl_record_id!(InvoicePositionId, "InvoicePositionId");
impl_record_id!(TransactionId, "TransactionId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        let id: PositionId = "17".parse().unwrap();
        assert_eq!(id.get(), 17);
        assert_eq!(id.to_string(), "17");
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!(matches!("0".parse::<ContractId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<ContractId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("abc".parse::<ContractId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&InvoiceId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: InvoiceId = serde_json::from_str("9").unwrap();
        assert_eq!(back, InvoiceId::new(9));
    }
}
