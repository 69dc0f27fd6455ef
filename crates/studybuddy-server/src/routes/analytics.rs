//! Analytics endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use studybuddy_core::analytics::{self, Analytics};
use studybuddy_core::TaskFilter;

use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_analytics))
}

#[derive(Serialize)]
struct AnalyticsResponse {
    success: bool,
    #[serde(flatten)]
    analytics: Analytics,
}

/// GET /api/analytics - aggregate stats over all tasks.
async fn get_analytics(State(state): State<AppState>) -> Result<Json<AnalyticsResponse>, ApiError> {
    let tasks = state.db.lock().await.list_tasks(&TaskFilter::default())?;
    Ok(Json(AnalyticsResponse {
        success: true,
        analytics: analytics::compute(&tasks),
    }))
}
