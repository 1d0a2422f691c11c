use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use farmgate_auth::{MutationError, UnknownPermission, ValidationError};

pub fn mutation_error_to_response(err: MutationError) -> axum::response::Response {
    match err {
        MutationError::Conflict { .. } => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        MutationError::InvalidOperation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_operation", msg)
        }
        MutationError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
    }
}

pub fn validation_error_to_response(err: ValidationError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
}

pub fn unknown_permission_to_response(err: UnknownPermission) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_permission", err.to_string())
}

/// Malformed or mistyped JSON bodies are validation errors, not 422s.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
