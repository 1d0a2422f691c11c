//! `farmgate-core`: shared value types for the access-control workspace.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod version;

pub use error::DomainError;
pub use id::{CompanyId, UserId};
pub use version::ExpectedVersion;
