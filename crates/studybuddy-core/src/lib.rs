//! # StudyBuddy Core Library
//!
//! Core business logic for the StudyBuddy study-task manager. The REST
//! server is a thin HTTP layer over this library.
//!
//! ## Key Components
//!
//! - [`TaskDb`]: SQLite task storage (plus a small kv store)
//! - [`analytics`]: aggregate task statistics
//! - [`calendar`]: Google Calendar OAuth, client, and reconciliation
//! - [`SuggestionClient`]: AI study coach over a chat-completion API
//! - [`Config`]: TOML application configuration

pub mod ai;
pub mod analytics;
pub mod calendar;
pub mod config;
pub mod error;
pub mod storage;
pub mod task;

pub use ai::SuggestionClient;
pub use calendar::{CalendarClient, CalendarSession, SyncStats};
pub use config::Config;
pub use error::{
    AiError, CalendarError, ConfigError, CoreError, DatabaseError, OAuthError, ValidationError,
};
pub use storage::{TaskDb, TaskFilter};
pub use task::{NewTask, Priority, Status, Task, TaskPatch};
