use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgebill_catalog::{LineItem, LineItemRequest, Position};
use forgebill_core::{
    line_total, sum_totals, ContractId, ContractPositionId, CustomerId, DomainResult, Entity,
    PositionId,
};
use forgebill_customers::Customer;

/// Join record: `amount` units of a position used in a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPosition {
    pub id: ContractPositionId,
    pub contract_id: ContractId,
    pub position_id: PositionId,
    pub amount: Decimal,
}

/// Contract record with its join records (positions not loaded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub created_at: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub accepted: bool,
    pub positions: Vec<ContractPosition>,
}

impl Entity for Contract {
    const KIND: &'static str = "contract";
    type Id = ContractId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A join record together with the live position it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractLine {
    pub id: ContractPositionId,
    pub position: Position,
    pub amount: Decimal,
}

impl ContractLine {
    /// Quantity × live position price.
    pub fn total(&self) -> DomainResult<Decimal> {
        line_total(self.amount, self.position.price)
    }
}

/// Fully hydrated contract: customer, join records and their positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDetails {
    pub id: ContractId,
    pub created_at: DateTime<Utc>,
    pub accepted: bool,
    pub customer: Customer,
    pub lines: Vec<ContractLine>,
}

impl ContractDetails {
    pub fn total(&self) -> DomainResult<Decimal> {
        sum_totals(
            self.lines
                .iter()
                .map(ContractLine::total)
                .collect::<DomainResult<Vec<_>>>()?,
        )
    }
}

/// Create payload for a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRequest {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub positions: Vec<LineItemRequest>,
}

/// Update payload for a contract: only the acceptance flag is mutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractUpdate {
    pub accepted: bool,
}

/// Resolved contract draft handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContract {
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub accepted: bool,
    pub lines: Vec<LineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn customer() -> Customer {
        Customer {
            id: CustomerId::new(1),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            street: String::new(),
            postal_code: String::new(),
            city: String::new(),
            tax_id: None,
        }
    }

    fn line(id: i64, position: i64, price: &str, amount: &str) -> ContractLine {
        ContractLine {
            id: ContractPositionId::new(id),
            position: Position {
                id: PositionId::new(position),
                text: format!("position {position}"),
                price: dec(price),
                unit: "pc".to_string(),
            },
            amount: dec(amount),
        }
    }

    #[test]
    fn total_sums_live_line_totals() {
        let details = ContractDetails {
            id: ContractId::new(7),
            created_at: Utc::now(),
            accepted: false,
            customer: customer(),
            lines: vec![line(1, 10, "10.00", "2"), line(2, 11, "5.50", "1")],
        };
        assert_eq!(details.total().unwrap(), dec("25.50"));
    }

    #[test]
    fn request_without_positions_deserializes() {
        let req: ContractRequest = serde_json::from_str(r#"{"customer_id":3}"#).unwrap();
        assert_eq!(req.customer_id, CustomerId::new(3));
        assert!(req.positions.is_empty());
    }
}
