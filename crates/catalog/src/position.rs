use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgebill_core::{ensure_bounded, DomainError, DomainResult, Entity, PositionId, MAX_PRICE};

/// Catalog position: description, unit price and unit label.
///
/// Join records reference positions by id and read the *live* price, so updating a
/// position changes the computed totals of every contract and invoice using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub text: String,
    pub price: Decimal,
    pub unit: String,
}

impl Position {
    pub fn from_request(id: PositionId, request: PositionRequest) -> Self {
        Self {
            id,
            text: request.text,
            price: request.price,
            unit: request.unit,
        }
    }

    pub fn apply(&mut self, request: PositionRequest) {
        self.text = request.text;
        self.price = request.price;
        self.unit = request.unit;
    }
}

impl Entity for Position {
    const KIND: &'static str = "position";
    type Id = PositionId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Create/update payload for a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRequest {
    pub text: String,
    pub price: Decimal,
    pub unit: String,
}

impl PositionRequest {
    pub fn normalized(self) -> Self {
        Self {
            text: self.text.trim().to_string(),
            price: self.price,
            unit: self.unit.trim().to_string(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.text.trim().is_empty() {
            return Err(DomainError::validation("position text must not be blank"));
        }
        if self.unit.trim().is_empty() {
            return Err(DomainError::validation("position unit must not be blank"));
        }
        if self.price < Decimal::ZERO {
            return Err(DomainError::validation("position price must not be negative"));
        }
        ensure_bounded("position price", self.price, MAX_PRICE)
    }
}
