use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use farmgate_core::{CompanyId, UserId};

use crate::decision::{Decision, DenyReason};
use crate::overrides::{Subject, UserOverride};
use crate::resolver::{self, PermissionSource};
use crate::store::{OverrideStore, StoreError};
use crate::{Permission, Role, RoleTable};

/// One authorization question: may `user_id`, acting as `role`, perform an
/// operation requiring all of `required_permissions` (optionally on a resource
/// owned by `resource_owner_company_id`)?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub role: Role,
    pub user_id: String,
    pub required_permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_owner_company_id: Option<String>,
}

impl AccessRequest {
    pub fn new<I, P>(role: Role, user_id: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            role,
            user_id: user_id.into(),
            required_permissions: required.into_iter().map(Into::into).collect(),
            resource_owner_company_id: None,
        }
    }

    /// Build a request for an authenticated subject.
    pub fn for_subject(subject: &Subject, required: &[Permission]) -> Self {
        Self::new(
            subject.role,
            subject.user_id.as_str(),
            required.iter().map(|p| p.as_str()),
        )
    }

    pub fn owned_by(mut self, company_id: impl Into<String>) -> Self {
        self.resource_owner_company_id = Some(company_id.into());
        self
    }

    /// Reject malformed requests before any store access.
    pub fn validate(&self) -> Result<ValidRequest<'_>, ValidationError> {
        let user_id = UserId::new(self.user_id.as_str()).map_err(|_| ValidationError::BlankUserId)?;

        if self.required_permissions.is_empty() {
            return Err(ValidationError::NoPermissionsRequested);
        }

        let owner = match self.resource_owner_company_id.as_deref() {
            None => None,
            Some(raw) => {
                Some(CompanyId::new(raw).map_err(|_| ValidationError::BlankResourceOwner)?)
            }
        };

        Ok(ValidRequest {
            role: self.role,
            user_id,
            required: &self.required_permissions,
            owner,
        })
    }
}

/// An [`AccessRequest`] whose shape has been checked.
#[derive(Debug, Clone)]
pub struct ValidRequest<'a> {
    pub role: Role,
    pub user_id: UserId,
    pub required: &'a [String],
    pub owner: Option<CompanyId>,
}

/// Malformed access request (400-class); never reaches the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("userId must not be blank")]
    BlankUserId,

    #[error("requiredPermissions must name at least one permission")]
    NoPermissionsRequested,

    #[error("resourceOwnerCompanyId must not be blank when present")]
    BlankResourceOwner,
}

/// Parse every required token against the catalog.
///
/// The first unknown token is returned as the error.
pub fn parse_required(tokens: &[String]) -> Result<Vec<Permission>, String> {
    tokens
        .iter()
        .map(|t| Permission::parse(t).map_err(|_| t.clone()))
        .collect()
}

/// Decide a request once the override snapshot is in hand.
///
/// - No IO
/// - No panics
/// - All-of semantics over `required`, then company scoping
pub fn decide(
    roles: &RoleTable,
    role: Role,
    override_: Option<&UserOverride>,
    required: &[Permission],
    owner: Option<&CompanyId>,
) -> Decision {
    let effective = roles.effective_permissions(role, override_);

    if let Some(missing) = required.iter().find(|p| !effective.contains(p)) {
        return Decision::deny_with(DenyReason::MissingPermission, missing.as_str());
    }

    if let Some(owner) = owner {
        if !role.bypasses_company_scope() {
            let acting_company = override_.and_then(|o| o.company_id.as_ref());
            if acting_company != Some(owner) {
                return Decision::deny(DenyReason::CrossTenantAccess);
            }
        }
    }

    Decision::Allow
}

/// Access Decision Function: role table + override store + optional read timeout.
///
/// Request-scoped and side-effect free; many checks may run concurrently.
/// The only suspension point is the single override read.
pub struct AccessControl<S> {
    roles: Arc<RoleTable>,
    store: S,
    read_timeout: Option<Duration>,
}

impl<S> AccessControl<S>
where
    S: OverrideStore,
{
    pub fn new(roles: Arc<RoleTable>, store: S) -> Self {
        Self {
            roles,
            store,
            read_timeout: None,
        }
    }

    /// Bound the override read; elapsing counts as an unavailable store.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn roles(&self) -> &Arc<RoleTable> {
        &self.roles
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decide whether `request` is allowed.
    ///
    /// Only a malformed request is an error; every authorization outcome,
    /// including store failure, is a [`Decision`].
    pub async fn check_access(&self, request: &AccessRequest) -> Result<Decision, ValidationError> {
        Ok(self.evaluate(request).await?.decision)
    }

    /// Like [`check_access`](Self::check_access), but reports how the
    /// decision was reached.
    pub async fn explain_access(
        &self,
        request: &AccessRequest,
    ) -> Result<AccessExplanation, ValidationError> {
        let eval = self.evaluate(request).await?;
        Ok(AccessExplanation::build(&self.roles, request, eval))
    }

    async fn evaluate(&self, request: &AccessRequest) -> Result<Evaluation, ValidationError> {
        let valid = request.validate()?;

        let required = match parse_required(valid.required) {
            Ok(required) => required,
            Err(token) => {
                tracing::error!(
                    user_id = %valid.user_id,
                    role = %valid.role,
                    token = %token,
                    "access check names a permission outside the catalog"
                );
                return Ok(Evaluation {
                    decision: Decision::deny_with(DenyReason::InvalidPermission, token),
                    snapshot: None,
                    loaded: false,
                });
            }
        };

        let snapshot = match self.load_override(&valid.user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(user_id = %valid.user_id, error = %e, "override lookup failed; denying");
                return Ok(Evaluation {
                    decision: Decision::deny(DenyReason::Unavailable),
                    snapshot: None,
                    loaded: false,
                });
            }
        };

        let decision = decide(
            &self.roles,
            valid.role,
            snapshot.as_ref(),
            &required,
            valid.owner.as_ref(),
        );

        Ok(Evaluation {
            decision,
            snapshot,
            loaded: true,
        })
    }

    async fn load_override(&self, user_id: &UserId) -> Result<Option<UserOverride>, StoreError> {
        let read = self.store.get_override(user_id);
        match self.read_timeout {
            None => read.await,
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| StoreError::Unavailable(format!("read timed out after {limit:?}")))?,
        }
    }
}

struct Evaluation {
    decision: Decision,
    snapshot: Option<UserOverride>,
    loaded: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an access decision.
///
/// Answers "why was this request allowed/denied?" without changing the answer:
/// `decision` is exactly what [`AccessControl::check_access`] returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessExplanation {
    pub decision: Decision,
    pub role: Role,
    pub user_id: String,

    /// Whether the override snapshot was consulted (false on early denial).
    pub override_loaded: bool,
    pub override_version: Option<u64>,

    pub base_permissions: Vec<String>,
    pub custom_permissions: Vec<String>,
    pub revoked_permissions: Vec<String>,
    pub effective_permissions: Vec<String>,

    /// Per-token provenance, in request order.
    pub checks: Vec<PermissionCheck>,

    pub company_scope: CompanyScope,

    /// Human-readable summary.
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheck {
    pub permission: String,
    /// `None` when the token is not in the catalog.
    pub source: Option<PermissionSource>,
    pub granted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyScope {
    pub resource_owner_company_id: Option<String>,
    pub acting_company_id: Option<String>,
    pub bypassed: bool,
}

impl AccessExplanation {
    fn build(roles: &RoleTable, request: &AccessRequest, eval: Evaluation) -> Self {
        let base = roles.base_permissions(request.role);
        let snapshot = eval.snapshot.as_ref();
        let effective = if eval.loaded {
            resolver::effective_permissions(base, snapshot)
        } else {
            BTreeSet::new()
        };

        let checks = request
            .required_permissions
            .iter()
            .map(|token| match Permission::parse(token) {
                Ok(p) => {
                    let source = resolver::permission_source(base, snapshot, p);
                    PermissionCheck {
                        permission: token.clone(),
                        source: Some(source),
                        granted: eval.loaded && source.grants(),
                    }
                }
                Err(_) => PermissionCheck {
                    permission: token.clone(),
                    source: None,
                    granted: false,
                },
            })
            .collect();

        let reason = match &eval.decision {
            Decision::Allow => "every required permission is effective".to_string(),
            Decision::Deny { reason, detail } => {
                let token = detail.as_deref().unwrap_or_default();
                match reason {
                    DenyReason::InvalidPermission => format!("'{token}' is not a catalog permission"),
                    DenyReason::MissingPermission => format!(
                        "'{token}' is not in the effective set (role {}, {})",
                        request.role,
                        if snapshot.is_some_and(|o| o.revoked_permissions.iter().any(|p| p.as_str() == token)) {
                            "revoked by override"
                        } else {
                            "not granted"
                        }
                    ),
                    DenyReason::CrossTenantAccess => {
                        "resource belongs to a different company than the user".to_string()
                    }
                    DenyReason::Unavailable => "override store unavailable; denied fail-closed".to_string(),
                }
            }
        };

        Self {
            role: request.role,
            user_id: request.user_id.clone(),
            override_loaded: eval.loaded,
            override_version: snapshot.map(|o| o.version),
            base_permissions: tokens(base.iter()),
            custom_permissions: snapshot.map(|o| tokens(o.custom_permissions.iter())).unwrap_or_default(),
            revoked_permissions: snapshot.map(|o| tokens(o.revoked_permissions.iter())).unwrap_or_default(),
            effective_permissions: tokens(effective.iter()),
            checks,
            company_scope: CompanyScope {
                resource_owner_company_id: request.resource_owner_company_id.clone(),
                acting_company_id: snapshot
                    .and_then(|o| o.company_id.as_ref())
                    .map(|c| c.to_string()),
                bypassed: request.resource_owner_company_id.is_some()
                    && request.role.bypasses_company_scope(),
            },
            reason,
            decision: eval.decision,
        }
    }
}

fn tokens<'a>(perms: impl Iterator<Item = &'a Permission>) -> Vec<String> {
    perms.map(|p| p.as_str().to_string()).collect()
}
