//! Core error types for studybuddy-core.
//!
//! This module defines a comprehensive error hierarchy using thiserror
//! for better error handling and reporting across the library.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studybuddy-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// OAuth-related errors
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    /// Calendar API errors
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// AI suggestion errors
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// OAuth-specific errors.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// Token exchange failed
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Access token expired
    #[error("Access token expired and no refresh token available")]
    TokenExpired,

    /// Credentials not configured
    #[error("OAuth credentials not configured for {service}")]
    CredentialsNotConfigured { service: String },

    /// HTTP transport failure during a token request
    #[error("OAuth transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Calendar API errors.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// The Google Calendar API returned an error payload
    #[error("Calendar API error: {0}")]
    Api(String),

    /// Rate limited by the calendar API; one backoff sleep was already taken
    #[error("Calendar API rate limited (waited {waited_secs}s)")]
    RateLimited { waited_secs: u64 },

    /// A remote event failed schema validation
    #[error("Malformed calendar event: {0}")]
    MalformedEvent(String),

    /// OAuth failure while obtaining an access token
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// HTTP transport failure
    #[error("Calendar transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// AI suggestion errors.
#[derive(Error, Debug)]
pub enum AiError {
    /// No API key configured
    #[error("AI API key not configured")]
    MissingApiKey,

    /// The completion API returned an error payload
    #[error("Completion API error: {0}")]
    Api(String),

    /// HTTP transport failure
    #[error("Completion transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Required field missing or empty
    #[error("'{0}' is required")]
    Required(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
