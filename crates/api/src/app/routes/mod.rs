use axum::{routing::get, Router};

pub mod access;
pub mod overrides;
pub mod rbac;
pub mod system;

/// Router for endpoints that act on behalf of a gateway-verified user.
pub fn admin_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/overrides", overrides::router())
        .nest("/rbac", rbac::router())
}
