use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmgate_core::{CompanyId, UserId};

use crate::{Permission, Role};

/// The already-verified identity handed over by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub user_id: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

impl Subject {
    pub fn new(user_id: UserId, role: Role, company_id: Option<CompanyId>) -> Self {
        Self {
            user_id,
            role,
            company_id,
        }
    }
}

/// Per-user delta layered on top of the role's base permissions.
///
/// # Invariants
/// - `custom_permissions ∩ base(role) = ∅`
/// - `revoked_permissions ⊆ base(role)`
/// - `version` is 0 until first persisted, then +1 per successful write.
///
/// Records read from a store are treated as snapshots: the resolver tolerates
/// a token present in both sets (revocation wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverride {
    pub user_id: UserId,
    pub role: Role,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub custom_permissions: BTreeSet<Permission>,
    #[serde(default)]
    pub revoked_permissions: BTreeSet<Permission>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl UserOverride {
    /// An empty, not-yet-persisted override for `subject`.
    pub fn empty(subject: &Subject) -> Self {
        Self {
            user_id: subject.user_id.clone(),
            role: subject.role,
            company_id: subject.company_id.clone(),
            custom_permissions: BTreeSet::new(),
            revoked_permissions: BTreeSet::new(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    /// Whether the override changes nothing about the role's base set.
    pub fn is_neutral(&self) -> bool {
        self.custom_permissions.is_empty() && self.revoked_permissions.is_empty()
    }

    /// Same user, role, company and permission deltas (ignores bookkeeping).
    pub fn same_content(&self, other: &UserOverride) -> bool {
        self.user_id == other.user_id
            && self.role == other.role
            && self.company_id == other.company_id
            && self.custom_permissions == other.custom_permissions
            && self.revoked_permissions == other.revoked_permissions
    }

    /// Re-express this override against `base`, dropping entries that would
    /// violate the invariants (used when the user's role changed).
    pub fn rebase(&mut self, role: Role, base: &BTreeSet<Permission>) {
        self.role = role;
        self.custom_permissions.retain(|p| !base.contains(p));
        self.revoked_permissions.retain(|p| base.contains(p));
    }
}
