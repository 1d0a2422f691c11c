//! Override Store boundary.
//!
//! The core only borrows a snapshot per check and writes through
//! compare-and-set on `version`; persistence itself lives behind this trait.

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use farmgate_core::{ExpectedVersion, UserId};

use crate::overrides::UserOverride;

pub use in_memory::InMemoryOverrideStore;

/// Override store operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored version differs from the one the caller last read.
    #[error("optimistic concurrency check failed (expected: {expected}, actual: {actual})")]
    Conflict { expected: u64, actual: u64 },

    /// The backing store could not be reached or answered with an error.
    #[error("override store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence contract for per-user overrides.
///
/// Implementations must:
/// - return `Ok(None)` for users without an override (not an error)
/// - reject `save_override` with [`StoreError::Conflict`] when the stored
///   version does not match `expected_version`, leaving the record untouched
/// - persist the record with `version = expected_version + 1` and return it
#[async_trait::async_trait]
pub trait OverrideStore: Send + Sync {
    async fn get_override(&self, user_id: &UserId) -> Result<Option<UserOverride>, StoreError>;

    async fn save_override(
        &self,
        record: UserOverride,
        expected_version: ExpectedVersion,
    ) -> Result<UserOverride, StoreError>;
}

#[async_trait::async_trait]
impl<S> OverrideStore for Arc<S>
where
    S: OverrideStore + ?Sized,
{
    async fn get_override(&self, user_id: &UserId) -> Result<Option<UserOverride>, StoreError> {
        (**self).get_override(user_id).await
    }

    async fn save_override(
        &self,
        record: UserOverride,
        expected_version: ExpectedVersion,
    ) -> Result<UserOverride, StoreError> {
        (**self).save_override(record, expected_version).await
    }
}
