//! Task CRUD endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use studybuddy_core::{NewTask, Priority, Status, TaskFilter, TaskPatch};

use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/{id}", get(get_task).put(update_task).delete(delete_task))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    status: Option<String>,
    priority: Option<String>,
}

impl ListParams {
    fn into_filter(self) -> Result<TaskFilter, ApiError> {
        let status = self
            .status
            .map(|s| s.parse::<Status>())
            .transpose()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        let priority = self
            .priority
            .map(|p| p.parse::<Priority>())
            .transpose()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        Ok(TaskFilter { status, priority })
    }
}

/// GET /api/tasks - list, optionally filtered by status/priority.
async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let filter = params.into_filter()?;
    let tasks = state.db.lock().await.list_tasks(&filter)?;
    Ok(Json(json!({ "success": true, "tasks": tasks })))
}

/// POST /api/tasks - create a task.
async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(new) = payload?;
    let task = state.db.lock().await.create_task(&new)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "task": task })),
    ))
}

/// GET /api/tasks/:id
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task = state
        .db
        .lock()
        .await
        .get_task(&id)?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    Ok(Json(json!({ "success": true, "task": task })))
}

/// PUT /api/tasks/:id - partial update.
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(patch) = payload?;
    let task = state
        .db
        .lock()
        .await
        .update_task(&id, &patch)?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    Ok(Json(json!({ "success": true, "task": task })))
}

/// DELETE /api/tasks/:id
///
/// Does not touch the external calendar; removing a linked event is an
/// explicit, separate call.
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state.db.lock().await.delete_task(&id)?;
    if !deleted {
        return Err(ApiError::not_found("Task not found"));
    }
    Ok(Json(json!({ "success": true, "message": "Task deleted" })))
}
