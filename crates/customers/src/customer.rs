use serde::{Deserialize, Serialize};

use forgebill_core::{CustomerId, DomainError, DomainResult, Entity};

/// Customer record: name and postal address, optionally a tax identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub tax_id: Option<String>,
}

impl Customer {
    /// Build the persisted record from a validated request.
    pub fn from_request(id: CustomerId, request: CustomerRequest) -> Self {
        Self {
            id,
            first_name: request.first_name,
            last_name: request.last_name,
            street: request.street,
            postal_code: request.postal_code,
            city: request.city,
            tax_id: request.tax_id,
        }
    }

    /// Replace every mutable field with the request's values.
    pub fn apply(&mut self, request: CustomerRequest) {
        self.first_name = request.first_name;
        self.last_name = request.last_name;
        self.street = request.street;
        self.postal_code = request.postal_code;
        self.city = request.city;
        self.tax_id = request.tax_id;
    }
}

impl Entity for Customer {
    const KIND: &'static str = "customer";
    type Id = CustomerId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Create/update payload for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub tax_id: Option<String>,
}

impl CustomerRequest {
    /// Trim all text fields and drop a blank tax id.
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            street: self.street.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            city: self.city.trim().to_string(),
            tax_id: self
                .tax_id
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            return Err(DomainError::validation(
                "customer needs a first or last name",
            ));
        }
        Ok(())
    }
}
