use serde::{Deserialize, Serialize};

/// Why a request was denied.
///
/// Denials are expected outcomes returned as values; callers branch on the
/// reason for UX and audit purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenyReason {
    /// A required token is not in the permission catalog (misconfiguration).
    InvalidPermission,
    /// A required permission is not in the effective set.
    MissingPermission,
    /// The resource belongs to another company.
    CrossTenantAccess,
    /// The override store could not be read (fail-closed).
    Unavailable,
}

impl DenyReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            DenyReason::InvalidPermission => "InvalidPermission",
            DenyReason::MissingPermission => "MissingPermission",
            DenyReason::CrossTenantAccess => "CrossTenantAccess",
            DenyReason::Unavailable => "Unavailable",
        }
    }
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an access check.
///
/// Serialized as `{ "allowed": bool, "reason"?: ..., "detail"?: ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "DecisionBody", from = "DecisionBody")]
pub enum Decision {
    Allow,
    Deny {
        reason: DenyReason,
        detail: Option<String>,
    },
}

impl Decision {
    pub fn deny(reason: DenyReason) -> Self {
        Decision::Deny {
            reason,
            detail: None,
        }
    }

    pub fn deny_with(reason: DenyReason, detail: impl Into<String>) -> Self {
        Decision::Deny {
            reason,
            detail: Some(detail.into()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny { reason, .. } => Some(*reason),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny { detail, .. } => detail.as_deref(),
        }
    }
}

/// Wire shape of a [`Decision`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionBody {
    allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<DenyReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl From<Decision> for DecisionBody {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Allow => Self {
                allowed: true,
                reason: None,
                detail: None,
            },
            Decision::Deny { reason, detail } => Self {
                allowed: false,
                reason: Some(reason),
                detail,
            },
        }
    }
}

impl From<DecisionBody> for Decision {
    fn from(value: DecisionBody) -> Self {
        match (value.allowed, value.reason) {
            (true, _) => Decision::Allow,
            (false, reason) => Decision::Deny {
                // A denial without a reason can only come from a degraded peer.
                reason: reason.unwrap_or(DenyReason::Unavailable),
                detail: value.detail,
            },
        }
    }
}
