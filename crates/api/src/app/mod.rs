//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: role table, override store and the two core services
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    // Administrative routes: require the gateway identity headers.
    let protected = routes::admin_router().layer(axum::middleware::from_fn(
        middleware::identity_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::access::router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
