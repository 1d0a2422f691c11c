use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::ActorContext;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn whoami(Extension(actor): Extension<ActorContext>) -> impl IntoResponse {
    Json(actor.subject().clone())
}
