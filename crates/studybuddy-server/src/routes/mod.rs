//! Route modules and the shared error envelope.
//!
//! Every response is a JSON envelope of shape
//! `{ "success": bool, ... | "error": string }`.

pub mod ai;
pub mod analytics;
pub mod calendar;
pub mod tasks;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use studybuddy_core::{CalendarError, CoreError, OAuthError};

/// Handler-level error converted into the JSON error envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        }
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::Validation(v) => ApiError::bad_request(v.to_string()),
            CoreError::Calendar(CalendarError::OAuth(o)) | CoreError::OAuth(o) => match o {
                OAuthError::CredentialsNotConfigured { .. } | OAuthError::TokenExpired => {
                    ApiError::unavailable(o.to_string())
                }
                _ => ApiError::internal(err.to_string()),
            },
            _ => ApiError::internal(err.to_string()),
        }
    }
}

impl From<CalendarError> for ApiError {
    fn from(err: CalendarError) -> Self {
        CoreError::Calendar(err).into()
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        CoreError::OAuth(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}
