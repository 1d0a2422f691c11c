//! API-side authorization guard.
//!
//! Handlers (here and in host services) call [`guard`] before doing any work;
//! the core decides, this module only maps the decision onto HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use farmgate_auth::{AccessControl, AccessRequest, Decision, DenyReason, OverrideStore, Permission};
use farmgate_core::CompanyId;

use crate::app::errors;
use crate::context::ActorContext;

/// Check `request` and turn anything but Allow into a response.
///
/// - Deny → 403 with the reason
/// - Deny(Unavailable) → 503; the store failed, the caller did nothing wrong
/// - malformed request → 400
pub async fn guard<S>(access: &AccessControl<S>, request: &AccessRequest) -> Result<(), Response>
where
    S: OverrideStore,
{
    let decision = access
        .check_access(request)
        .await
        .map_err(errors::validation_error_to_response)?;

    log_denial(request, &decision);

    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny {
            reason: DenyReason::Unavailable,
            ..
        } => Err(errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "authorization is temporarily unavailable",
        )),
        Decision::Deny { reason, detail } => Err(forbidden(reason, detail)),
    }
}

/// Audit log line for a denied request; Allow is not logged.
pub fn log_denial(request: &AccessRequest, decision: &Decision) {
    let Decision::Deny { reason, detail } = decision else {
        return;
    };
    let detail = detail.as_deref().unwrap_or("");

    match reason {
        DenyReason::InvalidPermission => tracing::error!(
            user_id = %request.user_id, role = %request.role, reason = %reason, detail, "request denied"
        ),
        DenyReason::Unavailable => tracing::warn!(
            user_id = %request.user_id, role = %request.role, reason = %reason, "request denied"
        ),
        DenyReason::MissingPermission | DenyReason::CrossTenantAccess => tracing::info!(
            user_id = %request.user_id, role = %request.role, reason = %reason, detail, "request denied"
        ),
    }
}

/// [`guard`] for the acting user of an administrative request.
pub async fn require<S>(
    access: &AccessControl<S>,
    actor: &ActorContext,
    required: &[Permission],
    resource_owner: Option<&CompanyId>,
) -> Result<(), Response>
where
    S: OverrideStore,
{
    let mut request = AccessRequest::for_subject(actor.subject(), required);
    if let Some(owner) = resource_owner {
        request = request.owned_by(owner.as_str());
    }
    guard(access, &request).await
}

/// 403 body for a denial decided outside the core (e.g. a scope mismatch).
pub fn forbidden(reason: DenyReason, detail: Option<String>) -> Response {
    (
        StatusCode::FORBIDDEN,
        axum::Json(json!({
            "error": "forbidden",
            "reason": reason,
            "detail": detail,
        })),
    )
        .into_response()
}
