//! Persisted billing records addressed by typed ids.

use crate::error::DomainError;

pub trait Entity {
    /// Lowercase record name used in errors and logs.
    const KIND: &'static str;

    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug + Into<i64>;

    fn id(&self) -> Self::Id;

    fn not_found(id: Self::Id) -> DomainError {
        DomainError::not_found(Self::KIND, id.into())
    }
}
