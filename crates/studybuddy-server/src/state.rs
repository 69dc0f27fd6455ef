//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use studybuddy_core::calendar::{CalendarClient, CalendarSession};
use studybuddy_core::{Config, SuggestionClient, TaskDb};

/// Calendar connection state: the API client plus the current session,
/// if the user has connected their calendar. An async mutex guards it so
/// concurrent manual syncs serialize instead of interleaving.
pub struct CalendarState {
    pub client: CalendarClient,
    pub session: Option<CalendarSession>,
}

#[derive(Clone)]
pub struct AppState {
    /// Async mutex: sync handlers hold the store across calendar calls.
    pub db: Arc<Mutex<TaskDb>>,
    pub calendar: Arc<Mutex<CalendarState>>,
    /// None when no AI API key is configured.
    pub suggest: Option<Arc<SuggestionClient>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build state over an already-open task store.
    pub fn with_db(config: Config, db: TaskDb) -> Self {
        let suggest = SuggestionClient::from_config(&config.ai)
            .ok()
            .map(Arc::new);
        let client = CalendarClient::new(config.google.calendar_id.clone());

        Self {
            db: Arc::new(Mutex::new(db)),
            calendar: Arc::new(Mutex::new(CalendarState {
                client,
                session: None,
            })),
            suggest,
            config: Arc::new(config),
        }
    }

    /// Open the default task store and build state.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let db = TaskDb::open_default()?;
        Ok(Self::with_db(config, db))
    }
}
