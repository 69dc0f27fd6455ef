//! Google Calendar endpoints: authorization, manual sync, per-task push.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use studybuddy_core::calendar::sync::{self, DEFAULT_HORIZON_DAYS};
use studybuddy_core::calendar::{oauth, CalendarSession, OAuthConfig};

use crate::routes::ApiError;
use crate::state::{AppState, CalendarState};

/// kv key under which OAuth tokens persist across restarts.
const TOKENS_KV_KEY: &str = "google_tokens";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth-url", get(auth_url))
        .route("/auth-code", post(auth_code))
        .route("/sync", post(sync_all))
        .route("/sync-task/{id}", post(sync_task).delete(unsync_task))
        .route("/status", get(status))
}

fn oauth_config(state: &AppState) -> Result<OAuthConfig, ApiError> {
    Ok(OAuthConfig::google(&state.config.google)?)
}

/// Make sure a session exists, loading persisted tokens on first use.
async fn ensure_session(state: &AppState, cal: &mut CalendarState) -> Result<(), ApiError> {
    if cal.session.is_some() {
        return Ok(());
    }

    let config = oauth_config(state)?;
    let stored = state.db.lock().await.kv_get(TOKENS_KV_KEY)?;
    let Some(tokens_json) = stored else {
        return Err(ApiError::unavailable(
            "Google Calendar is not connected. Authorize first.",
        ));
    };
    let tokens = serde_json::from_str(&tokens_json)
        .map_err(|e| ApiError::internal(format!("stored tokens are unreadable: {e}")))?;

    cal.session = Some(CalendarSession::new(config, tokens));
    Ok(())
}

/// Write the session's tokens back to the kv store; refreshes happen in
/// place during calendar calls.
async fn persist_session(state: &AppState, cal: &CalendarState) -> Result<(), ApiError> {
    if let Some(session) = &cal.session {
        let tokens_json = serde_json::to_string(session.tokens())
            .map_err(|e| ApiError::internal(e.to_string()))?;
        state.db.lock().await.kv_set(TOKENS_KV_KEY, &tokens_json)?;
    }
    Ok(())
}

/// GET /api/google-calendar/auth-url
async fn auth_url(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let config = oauth_config(&state)?;
    Ok(Json(json!({
        "success": true,
        "authUrl": config.authorization_url(),
        "message": "Visit this URL to authorize the application",
    })))
}

#[derive(Deserialize)]
struct AuthCodeRequest {
    #[serde(default)]
    code: String,
}

/// POST /api/google-calendar/auth-code
async fn auth_code(
    State(state): State<AppState>,
    payload: Result<Json<AuthCodeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    if req.code.trim().is_empty() {
        return Err(ApiError::bad_request("Authorization code is required"));
    }

    let config = oauth_config(&state)?;
    let tokens = oauth::exchange_code(&config, req.code.trim()).await?;

    let mut cal = state.calendar.lock().await;
    cal.session = Some(CalendarSession::new(config, tokens));
    persist_session(&state, &cal).await?;
    tracing::info!("google calendar connected");

    Ok(Json(json!({
        "success": true,
        "message": "Authorization successful. Google Calendar is connected.",
    })))
}

#[derive(Debug, Default, Deserialize)]
struct SyncParams {
    days: Option<i64>,
}

/// POST /api/google-calendar/sync - full reconciliation pass.
async fn sync_all(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
) -> Result<Json<Value>, ApiError> {
    let mut cal = state.calendar.lock().await;
    ensure_session(&state, &mut cal).await?;

    let horizon = params.days.unwrap_or(DEFAULT_HORIZON_DAYS);
    let db = state.db.lock().await;
    let CalendarState { client, session } = &mut *cal;
    let session = session.as_mut().ok_or_else(|| {
        ApiError::unavailable("Google Calendar is not connected. Authorize first.")
    })?;

    let stats = sync::sync_once(&db, client, session, horizon).await?;
    drop(db);
    persist_session(&state, &cal).await?;

    Ok(Json(json!({
        "success": true,
        "stats": stats,
        "message": "Synced with Google Calendar",
    })))
}

/// POST /api/google-calendar/sync-task/:id - push one task's event.
async fn sync_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut cal = state.calendar.lock().await;
    ensure_session(&state, &mut cal).await?;

    let db = state.db.lock().await;
    let CalendarState { client, session } = &mut *cal;
    let session = session.as_mut().ok_or_else(|| {
        ApiError::unavailable("Google Calendar is not connected. Authorize first.")
    })?;

    let event_id = sync::push_task(&db, client, session, &id, &state.config.google.time_zone)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    drop(db);
    persist_session(&state, &cal).await?;

    Ok(Json(json!({
        "success": true,
        "eventId": event_id,
        "message": "Task synced with Google Calendar",
    })))
}

/// DELETE /api/google-calendar/sync-task/:id - remove a task's event.
async fn unsync_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut cal = state.calendar.lock().await;
    ensure_session(&state, &mut cal).await?;

    let db = state.db.lock().await;
    let CalendarState { client, session } = &mut *cal;
    let session = session.as_mut().ok_or_else(|| {
        ApiError::unavailable("Google Calendar is not connected. Authorize first.")
    })?;

    let found = sync::remove_task_event(&db, client, session, &id).await?;
    drop(db);
    if !found {
        return Err(ApiError::not_found("Task not found"));
    }
    persist_session(&state, &cal).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Task removed from Google Calendar",
    })))
}

/// GET /api/google-calendar/status - connection status, never 503.
async fn status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mut cal = state.calendar.lock().await;
    let initialized = ensure_session(&state, &mut cal).await.is_ok();

    Ok(Json(json!({
        "success": true,
        "initialized": initialized,
        "message": if initialized {
            "Google Calendar is connected"
        } else {
            "Google Calendar is not connected"
        },
    })))
}
