//! Route registration — collects all module routes + system endpoints.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use users::service::UserService;

/// Build the complete router with all routes.
///
/// Layer order matters: the session middleware guards every module
/// route, CORS wraps it so even 401 responses carry CORS headers and
/// preflights never hit authentication, and tracing sits outermost.
pub fn build_router(
    user_service: Arc<UserService>,
    module_routes: Vec<(&str, Router)>,
    cors: CorsLayer,
) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    // Mount each module's routes under /{module_name}.
    // Module routes are already Router<()> (they called .with_state() internally).
    for (name, router) in module_routes {
        app = app.nest(&format!("/{name}"), router);
    }

    app.layer(middleware::from_fn_with_state(
        user_service,
        users::api::session_middleware,
    ))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
}

/// CORS for the single allowed frontend origin, with credentials —
/// sessions ride on cookies.
pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid CORS origin '{origin}': {e}"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE]))
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "corecrmd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
