//! Task ↔ calendar event projection.
//!
//! Events carry a private metadata map correlating them back to a local
//! task id, plus the task's priority (as a color code) and status. The
//! metadata is validated on read so malformed remote events fail closed
//! instead of silently defaulting.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::task::{Priority, Status, Task};

/// Private-metadata key carrying the correlation id.
pub const META_TASK_ID: &str = "studybuddyTaskId";
const META_PRIORITY: &str = "priority";
const META_STATUS: &str = "status";

/// Event duration assumed when an event has no end time, in minutes.
const DEFAULT_DURATION_MIN: i64 = 30;

/// Map a priority to its Google Calendar color code.
pub fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "11",   // Red
        Priority::Medium => "5",  // Yellow
        Priority::Low => "10",    // Green
    }
}

/// Reverse-map a color code to a priority, defaulting to medium.
pub fn color_priority(color_id: Option<&str>) -> Priority {
    match color_id {
        Some("11") => Priority::High,
        Some("5") => Priority::Medium,
        Some("10") => Priority::Low,
        _ => Priority::Medium,
    }
}

/// A timed boundary of a calendar event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<HashMap<String, String>>,
}

/// A Google Calendar v3 event, restricted to the fields this app reads
/// and writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    /// Remote last-modified timestamp, set by the calendar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
}

/// Validated correlation metadata read from an event's private map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    pub task_id: String,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

impl EventMetadata {
    /// Extract metadata from an event.
    ///
    /// Returns `Ok(None)` for events that carry no correlation id (not
    /// ours). Present but unparsable priority/status values are an error.
    pub fn from_event(event: &EventResource) -> Result<Option<Self>, CalendarError> {
        let Some(private) = event
            .extended_properties
            .as_ref()
            .and_then(|p| p.private.as_ref())
        else {
            return Ok(None);
        };
        let Some(task_id) = private.get(META_TASK_ID) else {
            return Ok(None);
        };

        let priority = private
            .get(META_PRIORITY)
            .map(|s| {
                s.parse::<Priority>().map_err(|e| {
                    CalendarError::MalformedEvent(format!(
                        "event {:?}: {e}",
                        event.id.as_deref().unwrap_or("?")
                    ))
                })
            })
            .transpose()?;
        let status = private
            .get(META_STATUS)
            .map(|s| {
                s.parse::<Status>().map_err(|e| {
                    CalendarError::MalformedEvent(format!(
                        "event {:?}: {e}",
                        event.id.as_deref().unwrap_or("?")
                    ))
                })
            })
            .transpose()?;

        Ok(Some(Self {
            task_id: task_id.clone(),
            priority,
            status,
        }))
    }
}

/// Project a task to a calendar event: start = deadline, end = start +
/// estimate, color from priority, correlation metadata embedded.
pub fn task_to_event(task: &Task, time_zone: &str) -> EventResource {
    let start = task.deadline;
    let duration = if task.estimate_minutes > 0 {
        task.estimate_minutes
    } else {
        DEFAULT_DURATION_MIN
    };
    let end = start + Duration::minutes(duration);

    let description = task.description.clone().unwrap_or_else(|| {
        format!(
            "StudyBuddy task\nPriority: {}\nEstimated: {} minutes",
            task.priority, task.estimate_minutes
        )
    });

    let mut private = HashMap::new();
    private.insert(META_TASK_ID.to_string(), task.id.clone());
    private.insert(META_PRIORITY.to_string(), task.priority.to_string());
    private.insert(META_STATUS.to_string(), task.status.to_string());

    EventResource {
        id: None,
        summary: Some(task.title.clone()),
        description: Some(description),
        start: Some(EventDateTime {
            date_time: Some(start),
            time_zone: Some(time_zone.to_string()),
        }),
        end: Some(EventDateTime {
            date_time: Some(end),
            time_zone: Some(time_zone.to_string()),
        }),
        color_id: Some(priority_color(task.priority).to_string()),
        updated: None,
        extended_properties: Some(ExtendedProperties {
            private: Some(private),
        }),
    }
}

/// Build a local task from a remote event.
///
/// Fails closed when the event lacks a correlation id, a summary, or a
/// timed start.
pub fn event_to_task(
    event: &EventResource,
    calendar_id: &str,
    now: DateTime<Utc>,
) -> Result<Task, CalendarError> {
    let meta = EventMetadata::from_event(event)?.ok_or_else(|| {
        CalendarError::MalformedEvent("event carries no correlation id".to_string())
    })?;

    let summary = event
        .summary
        .clone()
        .ok_or_else(|| malformed(event, "missing summary"))?;
    let start = event
        .start
        .as_ref()
        .and_then(|s| s.date_time)
        .ok_or_else(|| malformed(event, "missing timed start"))?;
    let end = event
        .end
        .as_ref()
        .and_then(|e| e.date_time)
        .unwrap_or_else(|| start + Duration::minutes(DEFAULT_DURATION_MIN));

    let estimate_minutes = ((end - start).num_seconds() as f64 / 60.0).round() as i64;

    Ok(Task {
        id: meta.task_id,
        title: summary,
        description: event.description.clone(),
        deadline: start,
        priority: color_priority(event.color_id.as_deref()),
        estimate_minutes,
        status: meta.status.unwrap_or_default(),
        google_event_id: event.id.clone(),
        google_calendar_id: Some(calendar_id.to_string()),
        last_synced_at: Some(now),
        created_at: now,
        updated_at: now,
    })
}

fn malformed(event: &EventResource, message: &str) -> CalendarError {
    CalendarError::MalformedEvent(format!(
        "event {:?}: {message}",
        event.id.as_deref().unwrap_or("?")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        Task {
            id: "task-1".to_string(),
            title: "Ôn tập Toán".to_string(),
            description: None,
            deadline: Utc.with_ymd_and_hms(2025, 6, 3, 14, 0, 0).unwrap(),
            priority: Priority::High,
            estimate_minutes: 120,
            status: Status::Todo,
            google_event_id: None,
            google_calendar_id: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn color_mapping_is_a_bijection() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(color_priority(Some(priority_color(p))), p);
        }
        assert_eq!(priority_color(Priority::High), "11");
        assert_eq!(priority_color(Priority::Medium), "5");
        assert_eq!(priority_color(Priority::Low), "10");
    }

    #[test]
    fn unmapped_color_defaults_to_medium() {
        assert_eq!(color_priority(Some("7")), Priority::Medium);
        assert_eq!(color_priority(None), Priority::Medium);
    }

    #[test]
    fn projection_uses_deadline_estimate_and_color() {
        let task = sample_task();
        let event = task_to_event(&task, "UTC");

        assert_eq!(event.summary.as_deref(), Some("Ôn tập Toán"));
        assert_eq!(event.color_id.as_deref(), Some("11"));
        let start = event.start.as_ref().unwrap().date_time.unwrap();
        let end = event.end.as_ref().unwrap().date_time.unwrap();
        assert_eq!(start, task.deadline);
        assert_eq!(end - start, Duration::minutes(120));

        let private = event
            .extended_properties
            .as_ref()
            .unwrap()
            .private
            .as_ref()
            .unwrap();
        assert_eq!(private.get(META_TASK_ID).unwrap(), "task-1");
        assert_eq!(private.get("priority").unwrap(), "high");
        assert_eq!(private.get("status").unwrap(), "todo");
    }

    #[test]
    fn round_trip_preserves_core_fields() {
        let task = sample_task();
        let event = task_to_event(&task, "UTC");
        let now = Utc::now();
        let back = event_to_task(&event, "primary", now).unwrap();

        assert_eq!(back.id, task.id);
        assert_eq!(back.title, task.title);
        assert_eq!(back.deadline, task.deadline);
        assert_eq!(back.priority, Priority::High);
        assert_eq!(back.estimate_minutes, 120);
        assert_eq!(back.status, Status::Todo);
        assert_eq!(back.google_calendar_id.as_deref(), Some("primary"));
        assert_eq!(back.last_synced_at, Some(now));
    }

    #[test]
    fn event_without_end_gets_default_duration() {
        let mut event = task_to_event(&sample_task(), "UTC");
        event.end = None;
        let back = event_to_task(&event, "primary", Utc::now()).unwrap();
        assert_eq!(back.estimate_minutes, 30);
    }

    #[test]
    fn untagged_event_yields_no_metadata() {
        let event = EventResource {
            summary: Some("Dentist".to_string()),
            ..Default::default()
        };
        assert!(EventMetadata::from_event(&event).unwrap().is_none());
    }

    #[test]
    fn invalid_status_metadata_fails_closed() {
        let mut event = task_to_event(&sample_task(), "UTC");
        event
            .extended_properties
            .as_mut()
            .unwrap()
            .private
            .as_mut()
            .unwrap()
            .insert("status".to_string(), "archived".to_string());

        assert!(matches!(
            EventMetadata::from_event(&event),
            Err(CalendarError::MalformedEvent(_))
        ));
    }

    #[test]
    fn tagged_event_without_start_fails_closed() {
        let mut event = task_to_event(&sample_task(), "UTC");
        event.start = None;
        assert!(matches!(
            event_to_task(&event, "primary", Utc::now()),
            Err(CalendarError::MalformedEvent(_))
        ));
    }

    #[test]
    fn serializes_google_field_names() {
        let event = task_to_event(&sample_task(), "Asia/Ho_Chi_Minh");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["colorId"], "11");
        assert_eq!(json["start"]["timeZone"], "Asia/Ho_Chi_Minh");
        assert!(json["start"]["dateTime"].is_string());
        assert_eq!(
            json["extendedProperties"]["private"][META_TASK_ID],
            "task-1"
        );
    }
}
