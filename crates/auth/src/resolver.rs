//! Effective permission resolution.
//!
//! This is the one place where base permissions and overrides are combined.
//!
//! - No IO
//! - No panics
//! - Deterministic (ordered sets)

use std::collections::BTreeSet;

use serde::Serialize;

use crate::overrides::UserOverride;
use crate::Permission;

/// `(base ∪ custom) \ revoked`.
///
/// Revocation wins over both base and custom grants, even when a token is
/// present in both `custom_permissions` and `revoked_permissions`.
pub fn effective_permissions(
    base: &BTreeSet<Permission>,
    override_: Option<&UserOverride>,
) -> BTreeSet<Permission> {
    let Some(o) = override_ else {
        return base.clone();
    };

    base.iter()
        .chain(o.custom_permissions.iter())
        .filter(|p| !o.revoked_permissions.contains(p))
        .copied()
        .collect()
}

/// Where a permission in (or missing from) the effective set comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSource {
    /// Granted by the role's base set.
    Base,
    /// Granted by a per-user custom grant.
    Custom,
    /// Removed by a per-user revocation.
    Revoked,
    /// Neither granted nor revoked.
    Absent,
}

impl PermissionSource {
    pub fn grants(self) -> bool {
        matches!(self, PermissionSource::Base | PermissionSource::Custom)
    }
}

/// Classify `permission` the same way [`effective_permissions`] decides it.
pub fn permission_source(
    base: &BTreeSet<Permission>,
    override_: Option<&UserOverride>,
    permission: Permission,
) -> PermissionSource {
    if let Some(o) = override_ {
        if o.revoked_permissions.contains(&permission) {
            return PermissionSource::Revoked;
        }
        if !base.contains(&permission) && o.custom_permissions.contains(&permission) {
            return PermissionSource::Custom;
        }
    }

    if base.contains(&permission) {
        PermissionSource::Base
    } else {
        PermissionSource::Absent
    }
}
