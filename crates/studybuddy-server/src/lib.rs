//! HTTP API for the StudyBuddy task manager.
//!
//! Routes are grouped under `/api`; every handler returns the
//! `{ "success": bool, ... }` JSON envelope defined in [`routes`].

pub mod routes;
pub mod state;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

pub use state::AppState;

/// Build the full application router over shared state.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/tasks", routes::tasks::router())
        .nest("/api/analytics", routes::analytics::router())
        .nest("/api/ai", routes::ai::router())
        .nest("/api/google-calendar", routes::calendar::router())
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// GET /health - liveness plus which integrations have credentials.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let google = state.config.google.client_id.is_some();
    let ai = state.suggest.is_some();
    Json(json!({
        "status": "ok",
        "google": google,
        "ai": ai,
    }))
}
