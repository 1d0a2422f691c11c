//! `farmgate-auth`: pure authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage engines: the
//! override store is reached only through the [`OverrideStore`] trait.

pub mod authorize;
pub mod decision;
pub mod mutation;
pub mod overrides;
pub mod permissions;
pub mod resolver;
pub mod role_table;
pub mod roles;
pub mod store;

pub use authorize::{
    AccessControl, AccessExplanation, AccessRequest, ValidationError, decide,
};
pub use decision::{Decision, DenyReason};
pub use mutation::{MutationError, OverrideAdmin, OverrideChange};
pub use overrides::{Subject, UserOverride};
pub use permissions::{Permission, UnknownPermission, is_known_permission};
pub use resolver::{PermissionSource, effective_permissions};
pub use role_table::{ConfigurationError, RoleTable};
pub use roles::{Role, UnknownRole};
pub use store::{InMemoryOverrideStore, OverrideStore, StoreError};
