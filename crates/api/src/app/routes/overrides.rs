//! Override administration.
//!
//! Tenant scope always comes from stored state: the target's override record
//! when there is one, otherwise the company the actor is recorded under (the
//! guard checks the requested `companyId` against it). Non-admin actors can
//! never move a user between companies.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use farmgate_auth::{
    DenyReason, MutationError, OverrideChange, OverrideStore, Permission, Subject, UserOverride,
};
use farmgate_core::{CompanyId, ExpectedVersion, UserId};

use crate::app::{dto::OverrideChangeBody, errors, services::AppServices};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/:user_id", get(get_override))
        .route("/:user_id/grant", post(grant))
        .route("/:user_id/revoke", post(revoke))
        .route("/:user_id/restore", post(restore))
}

fn parse_user_id(raw: String) -> Result<UserId, axum::response::Response> {
    UserId::new(raw)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))
}

fn company_mismatch(actor: &ActorContext, target: &UserId, detail: &str) -> axum::response::Response {
    tracing::info!(
        actor = %actor.user_id(),
        user_id = %target,
        reason = %DenyReason::CrossTenantAccess,
        detail,
        "override access denied"
    );
    authz::forbidden(DenyReason::CrossTenantAccess, Some(detail.to_string()))
}

/// Company an override change is scoped to.
///
/// Admins may set any company; omitting it keeps the recorded one. Everyone
/// else must name the company, and it must match the stored record.
fn scope_company(
    actor: &ActorContext,
    target: &UserId,
    stored: Option<&UserOverride>,
    requested: Option<&CompanyId>,
) -> Result<Option<CompanyId>, axum::response::Response> {
    let recorded = stored.map(|r| r.company_id.as_ref());

    if actor.role().bypasses_company_scope() {
        return Ok(requested.or(recorded.flatten()).cloned());
    }

    let Some(requested) = requested else {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "companyId is required",
        ));
    };

    match recorded {
        None => Ok(Some(requested.clone())),
        Some(Some(current)) if current == requested => Ok(Some(current.clone())),
        Some(Some(_)) => Err(company_mismatch(actor, target, "companyId does not match the stored override")),
        Some(None) => Err(company_mismatch(actor, target, "override is not assigned to a company")),
    }
}

/// GET /overrides/:user_id - Current override record of a user
pub async fn get_override(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&services.access, &actor, &[Permission::UsersView], None).await {
        return resp;
    }

    let user_id = match parse_user_id(user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let record = match services.access.store().get_override(&user_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "no override for user"),
        Err(e) => return errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", e.to_string()),
    };

    if !actor.role().bypasses_company_scope() {
        let Some(company) = &record.company_id else {
            return company_mismatch(&actor, &user_id, "override is not assigned to a company");
        };
        if let Err(resp) =
            authz::require(&services.access, &actor, &[Permission::UsersView], Some(company)).await
        {
            return resp;
        }
    }

    (StatusCode::OK, Json(record)).into_response()
}

/// POST /overrides/:user_id/grant
pub async fn grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<String>,
    body: Result<Json<OverrideChangeBody>, JsonRejection>,
) -> axum::response::Response {
    change_override(&services, &actor, user_id, OverrideChange::Grant, body).await
}

/// POST /overrides/:user_id/revoke
pub async fn revoke(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<String>,
    body: Result<Json<OverrideChangeBody>, JsonRejection>,
) -> axum::response::Response {
    change_override(&services, &actor, user_id, OverrideChange::Revoke, body).await
}

/// POST /overrides/:user_id/restore
pub async fn restore(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<String>,
    body: Result<Json<OverrideChangeBody>, JsonRejection>,
) -> axum::response::Response {
    change_override(&services, &actor, user_id, OverrideChange::Restore, body).await
}

async fn change_override(
    services: &AppServices,
    actor: &ActorContext,
    user_id: String,
    change: OverrideChange,
    body: Result<Json<OverrideChangeBody>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    if let Err(resp) =
        authz::require(&services.access, actor, &[Permission::UsersManagePermissions], None).await
    {
        return resp;
    }

    let user_id = match parse_user_id(user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let permission = match Permission::parse(&body.permission) {
        Ok(p) => p,
        Err(e) => return errors::unknown_permission_to_response(e),
    };

    let stored = match services.admin.store().get_override(&user_id).await {
        Ok(stored) => stored,
        Err(e) => return errors::mutation_error_to_response(e.into()),
    };

    // The scope below is only valid for the version the caller read; the
    // write itself re-checks it under compare-and-set.
    let actual = stored.as_ref().map_or(0, |r| r.version);
    if actual != body.expected_version {
        return errors::mutation_error_to_response(MutationError::Conflict {
            expected: body.expected_version,
            actual,
        });
    }

    let company_id = match scope_company(actor, &user_id, stored.as_ref(), body.company_id.as_ref()) {
        Ok(company_id) => company_id,
        Err(resp) => return resp,
    };

    if let Err(resp) = authz::require(
        &services.access,
        actor,
        &[Permission::UsersManagePermissions],
        company_id.as_ref(),
    )
    .await
    {
        return resp;
    }

    let subject = Subject::new(user_id, body.role, company_id);
    let expected = ExpectedVersion::from_raw(body.expected_version);

    match services.admin.mutate(&subject, change, permission, expected).await {
        Ok(record) => {
            tracing::info!(
                actor = %actor.user_id(),
                user_id = %subject.user_id,
                change = %change,
                permission = %permission,
                version = record.version,
                "override change applied"
            );
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => errors::mutation_error_to_response(e),
    }
}
