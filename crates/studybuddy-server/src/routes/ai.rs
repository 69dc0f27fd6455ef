//! AI suggestion endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use studybuddy_core::Task;

use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/suggestion", post(suggestion))
}

#[derive(Deserialize)]
struct SuggestionRequest {
    tasks: Vec<Task>,
}

/// POST /api/ai/suggestion - one short study suggestion for a task list.
async fn suggestion(
    State(state): State<AppState>,
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    if req.tasks.is_empty() {
        return Err(ApiError::bad_request("Task list is required"));
    }

    let client = state
        .suggest
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("AI suggestions are not configured"))?;

    let suggestion = client
        .suggest(&req.tasks)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(json!({ "success": true, "suggestion": suggestion })))
}
