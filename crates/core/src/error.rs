//! Domain error model.

use thiserror::Error;

/// Domain-level error.
///
/// Only value construction fails here; store outages and authorization
/// outcomes are modelled by the auth crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. a blank identifier).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
