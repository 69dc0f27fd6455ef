//! One-shot reconciliation between Google Calendar and the task store.
//!
//! `sync_once` pulls tagged remote events inside a forward horizon and
//! merges them into local tasks by correlation id and timestamp
//! comparison. The pass writes to the task store only; it never writes
//! back to the calendar, and it never deletes local tasks in response to
//! remote deletions (local history survives). The first failing event
//! aborts the pass; the caller retries the whole thing.
//!
//! `push_task` / `remove_task_event` are the inverse direction: project
//! one task onto its calendar event.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::client::CalendarClient;
use super::event::{event_to_task, task_to_event, EventMetadata};
use super::oauth::CalendarSession;
use crate::error::{Result, ValidationError};
use crate::storage::TaskDb;

/// Default forward look-ahead window in days.
pub const DEFAULT_HORIZON_DAYS: i64 = 30;

/// Counters for one reconciliation pass. `deleted` is always 0: remote
/// deletions never remove local tasks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Pull tagged events within `[now, now + horizon_days]` and create or
/// update local tasks from them.
pub async fn sync_once(
    db: &TaskDb,
    client: &CalendarClient,
    session: &mut CalendarSession,
    horizon_days: i64,
) -> Result<SyncStats> {
    if horizon_days < 0 {
        return Err(ValidationError::InvalidValue {
            field: "horizonDays",
            message: "must be >= 0".to_string(),
        }
        .into());
    }

    let now = Utc::now();
    let time_max = now + Duration::days(horizon_days);
    let events = client.list_events(session, now, time_max).await?;

    let mut stats = SyncStats::default();
    for event in &events {
        let Some(meta) = EventMetadata::from_event(event)? else {
            continue; // not one of ours
        };

        match db.get_task(&meta.task_id)? {
            None => {
                let task = event_to_task(event, client.calendar_id(), now)?;
                db.insert_remote_task(&task)?;
                stats.created += 1;
            }
            Some(existing) => {
                let remote_updated = event.updated.unwrap_or(DateTime::UNIX_EPOCH);
                let last_synced = existing.last_synced_at.unwrap_or(DateTime::UNIX_EPOCH);
                if remote_updated > last_synced {
                    let mut task = event_to_task(event, client.calendar_id(), now)?;
                    task.created_at = existing.created_at;
                    db.overwrite_from_remote(&task)?;
                    stats.updated += 1;
                }
            }
        }
    }

    tracing::info!(
        created = stats.created,
        updated = stats.updated,
        "calendar sync completed"
    );
    Ok(stats)
}

/// Create or update the calendar event for one task and stamp its sync
/// fields. Returns the event id, or `None` when the task is unknown.
pub async fn push_task(
    db: &TaskDb,
    client: &CalendarClient,
    session: &mut CalendarSession,
    task_id: &str,
    time_zone: &str,
) -> Result<Option<String>> {
    let Some(task) = db.get_task(task_id)? else {
        return Ok(None);
    };

    let event = task_to_event(&task, time_zone);
    let event_id = match &task.google_event_id {
        Some(event_id) => {
            client.update_event(session, event_id, &event).await?;
            event_id.clone()
        }
        None => client.insert_event(session, &event).await?,
    };

    db.set_sync_fields(task_id, &event_id, client.calendar_id(), Utc::now())?;
    Ok(Some(event_id))
}

/// Delete the calendar event linked to a task, if any, and clear the
/// task's sync fields. Returns `false` when the task is unknown.
pub async fn remove_task_event(
    db: &TaskDb,
    client: &CalendarClient,
    session: &mut CalendarSession,
    task_id: &str,
) -> Result<bool> {
    let Some(task) = db.get_task(task_id)? else {
        return Ok(false);
    };

    if let Some(event_id) = &task.google_event_id {
        client.delete_event(session, event_id).await?;
        db.clear_sync_fields(task_id, Utc::now())?;
    }
    Ok(true)
}
