//! RBAC audit endpoints.
//!
//! Read-only views of the role table and the permission catalog, for
//! answering "which role grants what?" without reading configuration files.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use farmgate_auth::{Permission, Role};

use crate::app::dto::{PermissionView, RoleView};
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::ActorContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/roles/:role", get(get_role))
        .route("/permissions", get(list_permissions))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /rbac/roles - List all roles and their base permissions
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&services.access, &actor, &[Permission::AuditView], None).await {
        return resp;
    }

    let roles: Vec<RoleView> = services
        .roles()
        .iter()
        .map(|(role, perms)| role_view(role, perms.iter().copied().collect()))
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response()
}

/// GET /rbac/roles/:role - Base permissions of one role
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(role): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&services.access, &actor, &[Permission::AuditView], None).await {
        return resp;
    }

    let role: Role = match role.parse() {
        Ok(role) => role,
        Err(e) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("{e}")),
    };

    let perms = services.roles().base_permissions(role).iter().copied().collect();
    (StatusCode::OK, Json(role_view(role, perms))).into_response()
}

/// GET /rbac/permissions - The permission catalog with granting roles
pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&services.access, &actor, &[Permission::AuditView], None).await {
        return resp;
    }

    let roles = services.roles();
    let permissions: Vec<PermissionView> = Permission::ALL
        .iter()
        .map(|&permission| PermissionView {
            permission,
            category: permission.category(),
            granted_by: roles.roles_granting(permission),
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "permissions": permissions }))).into_response()
}

fn role_view(role: Role, permissions: Vec<Permission>) -> RoleView {
    RoleView {
        role,
        description: role.description(),
        permissions,
    }
}
