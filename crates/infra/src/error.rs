//! Storage error model.
//!
//! These are **infrastructure errors** (connectivity, constraints, decoding) as
//! opposed to domain errors (validation, missing references).

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The row targeted by an update/delete vanished between check and write.
    #[error("{table} {id} does not exist")]
    RowMissing { table: &'static str, id: i64 },

    /// A foreign key, unique or check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The backend cannot be reached (pool closed, timeout, poisoned lock).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A row could not be mapped back to a domain record.
    #[error("failed to decode row: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Map a sqlx error raised during `operation` to a [`StoreError`].
///
/// | sqlx error | PostgreSQL code | StoreError |
/// |---|---|---|
/// | Database (foreign key) | `23503` | `Constraint` |
/// | Database (unique) | `23505` | `Constraint` |
/// | Database (check) | `23514` | `Constraint` |
/// | Database (other) | any | `Database` |
/// | PoolClosed / PoolTimedOut / Io | n/a | `Unavailable` |
/// | ColumnDecode / ColumnNotFound / Decode | n/a | `Decode` |
pub fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} in {}", db_err.message(), operation);
            match db_err.code().as_deref() {
                Some("23503") | Some("23505") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_) => StoreError::Decode(format!("{operation}: {err}")),
        _ => StoreError::Database(format!("sqlx error in {operation}: {err}")),
    }
}
