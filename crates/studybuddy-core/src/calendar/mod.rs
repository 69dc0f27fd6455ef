//! Google Calendar integration: OAuth session handling, the REST client,
//! the task/event projection, and the one-shot reconciliation flow.

pub mod client;
pub mod event;
pub mod oauth;
pub mod sync;

pub use client::CalendarClient;
pub use event::{EventMetadata, EventResource};
pub use oauth::{CalendarSession, OAuthConfig, OAuthTokens};
pub use sync::SyncStats;
