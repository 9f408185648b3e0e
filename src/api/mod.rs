//! API layer -- axum routes, handlers, and middleware.

mod error;
mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use self::state::AppState;

/// Build the application router with all API routes.
///
/// CORS is wide open so the dashboard frontend can be served from
/// anywhere during development.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/api", routes::api_routes())
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness check for anyone poking the bare server.
async fn root() -> &'static str {
    "Rackwatch incident dashboard API is running"
}

async fn fallback() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "not found")
}
