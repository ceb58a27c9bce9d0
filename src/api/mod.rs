//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use routes::create_router;

/// Full application: health check plus the authenticated API.
///
/// Layers run outside-in: tracing, then authentication, then request logging.
pub fn build_app(state: AppState) -> Router {
    let protected = create_router()
        .route_layer(from_fn(middleware::logging_middleware))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK!"
}
