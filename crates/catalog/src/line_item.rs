use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgebill_core::{ensure_bounded, DomainError, DomainResult, PositionId, MAX_AMOUNT};

use crate::position::PositionRequest;

/// One line of a contract or invoice request.
///
/// Either `position_id` is a positive id of an existing position, or `text`,
/// `price` and `unit` describe a position to create inline. A non-positive
/// `position_id` is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    #[serde(default)]
    pub position_id: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Quantity of the position used by this line.
    pub amount: Decimal,
}

/// Where a line item's position comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionRef {
    Existing(PositionId),
    New(PositionRequest),
}

/// A validated line item, ready to be persisted as a join record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub position: PositionRef,
    pub amount: Decimal,
}

impl LineItem {
    pub fn existing_position(&self) -> Option<PositionId> {
        match &self.position {
            PositionRef::Existing(id) => Some(*id),
            PositionRef::New(_) => None,
        }
    }
}

impl LineItemRequest {
    /// Line item referencing an existing position.
    pub fn existing(position_id: PositionId, amount: Decimal) -> Self {
        Self {
            position_id: Some(position_id.get()),
            text: None,
            price: None,
            unit: None,
            amount,
        }
    }

    /// Line item creating its position inline.
    pub fn inline(
        text: impl Into<String>,
        price: Decimal,
        unit: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            position_id: None,
            text: Some(text.into()),
            price: Some(price),
            unit: Some(unit.into()),
            amount,
        }
    }

    /// Pure resolution step: no lookups, no writes.
    ///
    /// Existence of a referenced position is checked by the caller against the store.
    pub fn resolve(&self) -> DomainResult<LineItem> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::validation("line item amount must be positive"));
        }
        ensure_bounded("line item amount", self.amount, MAX_AMOUNT)?;

        if let Some(raw) = self.position_id.filter(|raw| *raw > 0) {
            return Ok(LineItem {
                position: PositionRef::Existing(PositionId::new(raw)),
                amount: self.amount,
            });
        }

        let request = match (&self.text, self.price, &self.unit) {
            (Some(text), Some(price), Some(unit)) => PositionRequest {
                text: text.clone(),
                price,
                unit: unit.clone(),
            }
            .normalized(),
            _ => {
                return Err(DomainError::validation(
                    "line item needs a position id or text, price and unit",
                ));
            }
        };
        request.validate()?;

        Ok(LineItem {
            position: PositionRef::New(request),
            amount: self.amount,
        })
    }
}

/// Resolve every line item in request order; the first failure wins.
pub fn resolve_all(items: &[LineItemRequest]) -> DomainResult<Vec<LineItem>> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.resolve().map_err(|e| match e {
                DomainError::Validation(msg) => {
                    DomainError::validation(format!("line item {}: {msg}", idx + 1))
                }
                other => other,
            })
        })
        .collect()
}
