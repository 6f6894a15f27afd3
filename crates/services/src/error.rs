//! Business-layer error taxonomy.
//!
//! Domain and store errors are folded into four outcomes the transport layer can
//! map directly: not found, bad request, conflict and an opaque internal failure.

use thiserror::Error;

use forgebill_core::{DomainError, Entity};
use forgebill_infra::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation would break a reference held by another record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Opaque to callers; the store detail is only logged.
    #[error("internal persistence failure")]
    Persistence(#[source] StoreError),

    /// Stored data broke a domain invariant (e.g. a total that cannot be computed).
    #[error("internal invariant failure")]
    Invariant(#[source] DomainError),
}

/// Coarse error class for the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Internal,
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        ServiceError::NotFound { entity, id }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ServiceError::Conflict(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::Validation(_) => ErrorKind::BadRequest,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Persistence(_) | ServiceError::Invariant(_) => ErrorKind::Internal,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::Validation(msg)
            }
            invariant @ DomainError::InvariantViolation(_) => {
                tracing::error!(error = %invariant, "domain invariant violated");
                ServiceError::Invariant(invariant)
            }
            DomainError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

/// NotFound for a record of kind `E`.
pub(crate) fn missing<E: Entity>(id: E::Id) -> ServiceError {
    E::not_found(id).into()
}

fn entity_for_table(table: &'static str) -> &'static str {
    match table {
        "customers" => "customer",
        "positions" => "position",
        "contracts" => "contract",
        "invoices" => "invoice",
        "transactions" => "transaction",
        other => other,
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            // Deleted between the existence check and the write.
            StoreError::RowMissing { table, id } => ServiceError::NotFound {
                entity: entity_for_table(table),
                id,
            },
            other => {
                tracing::error!(error = %other, "store operation failed");
                ServiceError::Persistence(other)
            }
        }
    }
}
