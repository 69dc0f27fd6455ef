//! Google Calendar API client.
//!
//! Thin wrapper over the Calendar v3 events endpoints. On a 429 the
//! client sleeps once for the API's retry hint and then surfaces the
//! rate limit to the caller; it never loop-retries on its own.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;

use super::event::EventResource;
use super::oauth::CalendarSession;
use crate::error::CalendarError;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Seconds to wait when the API gives no retry hint.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Maximum events fetched per listing.
const MAX_RESULTS: u32 = 250;

/// Google Calendar events client.
pub struct CalendarClient {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
}

impl CalendarClient {
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            calendar_id: calendar_id.into(),
        }
    }

    /// Point the client at a different API root (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    /// List events with a timed start inside `[time_min, time_max]`,
    /// ordered by start time.
    pub async fn list_events(
        &self,
        session: &mut CalendarSession,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<EventResource>, CalendarError> {
        let token = session.access_token().await?;
        let url = format!(
            "{}?timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime&maxResults={}",
            self.events_url(),
            urlencoding::encode(&time_min.to_rfc3339()),
            urlencoding::encode(&time_max.to_rfc3339()),
            MAX_RESULTS,
        );

        let resp = self.http.get(&url).bearer_auth(&token).send().await?;
        let body = Self::checked_json(resp).await?;

        let items = body
            .get("items")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
        let events: Vec<EventResource> = serde_json::from_value(items)
            .map_err(|e| CalendarError::MalformedEvent(e.to_string()))?;
        Ok(events)
    }

    /// Insert an event, returning the server-assigned event id.
    pub async fn insert_event(
        &self,
        session: &mut CalendarSession,
        event: &EventResource,
    ) -> Result<String, CalendarError> {
        let token = session.access_token().await?;
        let resp = self
            .http
            .post(self.events_url())
            .bearer_auth(&token)
            .json(event)
            .send()
            .await?;
        let body = Self::checked_json(resp).await?;

        body["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| CalendarError::Api("no event id in insert response".to_string()))
    }

    /// Replace an existing event.
    pub async fn update_event(
        &self,
        session: &mut CalendarSession,
        event_id: &str,
        event: &EventResource,
    ) -> Result<(), CalendarError> {
        let token = session.access_token().await?;
        let url = format!("{}/{}", self.events_url(), urlencoding::encode(event_id));
        let resp = self
            .http
            .put(&url)
            .bearer_auth(&token)
            .json(event)
            .send()
            .await?;
        Self::checked_json(resp).await?;
        Ok(())
    }

    /// Delete an event.
    pub async fn delete_event(
        &self,
        session: &mut CalendarSession,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        let token = session.access_token().await?;
        let url = format!("{}/{}", self.events_url(), urlencoding::encode(event_id));
        let resp = self.http.delete(&url).bearer_auth(&token).send().await?;

        let resp = Self::check_rate_limit(resp).await?;
        if !resp.status().is_success() {
            return Err(CalendarError::Api(format!(
                "delete returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Sleep the retry hint once on 429, then report the rate limit.
    async fn check_rate_limit(resp: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
        if resp.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(resp);
        }

        let waited_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

        tracing::warn!(waited_secs, "calendar API rate limited, backing off once");
        tokio::time::sleep(std::time::Duration::from_secs(waited_secs)).await;
        Err(CalendarError::RateLimited { waited_secs })
    }

    /// Rate-limit check plus Google error-payload extraction.
    async fn checked_json(resp: reqwest::Response) -> Result<serde_json::Value, CalendarError> {
        let resp = Self::check_rate_limit(resp).await?;
        let status = resp.status();
        let body: serde_json::Value = match resp.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(CalendarError::Api(format!("request returned {status}")));
            }
            Err(e) => return Err(CalendarError::Transport(e)),
        };

        if let Some(err) = body.get("error") {
            return Err(CalendarError::Api(err.to_string()));
        }
        if !status.is_success() {
            return Err(CalendarError::Api(format!("request returned {status}")));
        }
        Ok(body)
    }
}
