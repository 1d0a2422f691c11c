//! Decision endpoints for services that cannot link the core directly.
//!
//! The caller is trusted to pass the already-verified identity in the body;
//! these routes carry no identity headers of their own.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use farmgate_auth::AccessRequest;

use crate::app::{errors, services::AppServices};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/access/check", post(check))
        .route("/access/explain", post(explain))
}

/// POST /access/check - Decide a single access request
pub async fn check(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<AccessRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.access.check_access(&request).await {
        Ok(decision) => {
            authz::log_denial(&request, &decision);
            Json(decision).into_response()
        }
        Err(e) => errors::validation_error_to_response(e),
    }
}

/// POST /access/explain - Decide and report how the decision was reached
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<AccessRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.access.explain_access(&request).await {
        Ok(explanation) => Json(explanation).into_response(),
        Err(e) => errors::validation_error_to_response(e),
    }
}
