//! SQLite-based storage for study tasks.
//!
//! Single-connection database holding the `tasks` table plus a small
//! key-value table used for process state (stored OAuth tokens). All
//! operations are atomic at the single-row level; the sync flow does not
//! need multi-row transactions.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result};
use crate::task::{NewTask, Priority, Status, Task, TaskPatch};

/// Parse priority from a database string.
fn parse_priority(s: &str) -> Priority {
    match s {
        "low" => Priority::Low,
        "high" => Priority::High,
        _ => Priority::Medium,
    }
}

/// Parse status from a database string.
fn parse_status(s: &str) -> Status {
    match s {
        "doing" => Status::Doing,
        "done" => Status::Done,
        _ => Status::Todo,
    }
}

/// Parse datetime from an RFC3339 string with fallback to current time.
fn parse_datetime_fallback(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_datetime_fallback)
}

/// Build a Task from a database row (column order matches TASK_COLUMNS).
fn row_to_task(row: &rusqlite::Row) -> std::result::Result<Task, rusqlite::Error> {
    let priority_str: String = row.get(4)?;
    let status_str: String = row.get(6)?;
    let deadline_str: String = row.get(3)?;
    let created_str: String = row.get(10)?;
    let updated_str: String = row.get(11)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        deadline: parse_datetime_fallback(&deadline_str),
        priority: parse_priority(&priority_str),
        estimate_minutes: row.get(5)?,
        status: parse_status(&status_str),
        google_event_id: row.get(7)?,
        google_calendar_id: row.get(8)?,
        last_synced_at: parse_datetime_opt(row.get(9)?),
        created_at: parse_datetime_fallback(&created_str),
        updated_at: parse_datetime_fallback(&updated_str),
    })
}

const TASK_COLUMNS: &str = "id, title, description, deadline, priority, estimate_minutes, \
     status, google_event_id, google_calendar_id, last_synced_at, created_at, updated_at";

/// Optional status/priority filter for task listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}

/// SQLite database for task storage.
pub struct TaskDb {
    /// The mutex exists only to make `TaskDb: Sync` so shared references
    /// can cross await points; callers already serialize access.
    conn: Mutex<Connection>,
}

impl TaskDb {
    /// Open the database at the given path, creating the schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|source| {
            CoreError::Database(DatabaseError::OpenFailed {
                path: path.as_ref().to_path_buf(),
                source,
            })
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open the database at `~/.config/studybuddy/studybuddy.db`.
    pub fn open_default() -> Result<Self> {
        let path = data_dir()?.join("studybuddy.db");
        Self::open(path)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Database(DatabaseError::from(e)))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn migrate(&self) -> Result<()> {
        self.conn()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id                 TEXT PRIMARY KEY,
                    title              TEXT NOT NULL,
                    description        TEXT,
                    deadline           TEXT NOT NULL,
                    priority           TEXT NOT NULL DEFAULT 'medium',
                    estimate_minutes   INTEGER NOT NULL,
                    status             TEXT NOT NULL DEFAULT 'todo',
                    google_event_id    TEXT,
                    google_calendar_id TEXT,
                    last_synced_at     TEXT,
                    created_at         TEXT NOT NULL,
                    updated_at         TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                -- Create indexes for common query patterns
                CREATE INDEX IF NOT EXISTS idx_tasks_deadline ON tasks(deadline);
                CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
                CREATE INDEX IF NOT EXISTS idx_tasks_priority ON tasks(priority);",
            )
            .map_err(|e| CoreError::Database(DatabaseError::MigrationFailed(e.to_string())))
    }

    /// Create a task from a validated payload, generating a fresh id.
    ///
    /// # Errors
    /// Returns a validation error for a blank title or a non-positive
    /// estimate, or a database error if the insert fails.
    pub fn create_task(&self, new: &NewTask) -> Result<Task> {
        new.validate()?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            description: new
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
            deadline: new.deadline,
            priority: new.priority,
            estimate_minutes: new.estimate_minutes,
            status: new.status,
            google_event_id: None,
            google_calendar_id: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        self.insert(&task)?;
        Ok(task)
    }

    /// Insert a task built from a remote calendar event, keeping the id
    /// carried in the event metadata.
    pub fn insert_remote_task(&self, task: &Task) -> Result<()> {
        self.insert(task)
    }

    fn insert(&self, task: &Task) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tasks (id, title, description, deadline, priority, estimate_minutes,
                                status, google_event_id, google_calendar_id, last_synced_at,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                task.id,
                task.title,
                task.description,
                task.deadline.to_rfc3339(),
                task.priority.as_str(),
                task.estimate_minutes,
                task.status.as_str(),
                task.google_event_id,
                task.google_calendar_id,
                task.last_synced_at.map(|t| t.to_rfc3339()),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a task by id.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
        let task = stmt.query_row(params![id], row_to_task).optional()?;
        Ok(task)
    }

    /// List tasks, optionally filtered, ordered by deadline ascending then
    /// creation descending.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = filter.status {
            clauses.push("status = ?");
            args.push(status.as_str().to_string());
        }
        if let Some(priority) = filter.priority {
            clauses.push("priority = ?");
            args.push(priority.as_str().to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY deadline ASC, created_at DESC");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Apply a partial update, returning the stored task afterwards.
    /// Returns `Ok(None)` when the id is unknown.
    ///
    /// An empty (or whitespace) description in the patch clears the stored
    /// description.
    pub fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>> {
        patch.validate()?;

        let Some(mut task) = self.get_task(id)? else {
            return Ok(None);
        };

        if let Some(title) = &patch.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            let trimmed = description.trim();
            task.description = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Some(deadline) = patch.deadline {
            task.deadline = deadline;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(estimate) = patch.estimate_minutes {
            task.estimate_minutes = estimate;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        task.updated_at = Utc::now();

        self.conn().execute(
            "UPDATE tasks SET title = ?2, description = ?3, deadline = ?4, priority = ?5,
                              estimate_minutes = ?6, status = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.description,
                task.deadline.to_rfc3339(),
                task.priority.as_str(),
                task.estimate_minutes,
                task.status.as_str(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(Some(task))
    }

    /// Overwrite a task's mutable fields from remote event data and stamp
    /// the sync timestamp. Used by the reconciliation flow.
    pub fn overwrite_from_remote(&self, task: &Task) -> Result<()> {
        self.conn().execute(
            "UPDATE tasks SET title = ?2, description = ?3, deadline = ?4, priority = ?5,
                              estimate_minutes = ?6, status = ?7, google_event_id = ?8,
                              google_calendar_id = ?9, last_synced_at = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.description,
                task.deadline.to_rfc3339(),
                task.priority.as_str(),
                task.estimate_minutes,
                task.status.as_str(),
                task.google_event_id,
                task.google_calendar_id,
                task.last_synced_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Link a task to its calendar event after a successful push.
    pub fn set_sync_fields(
        &self,
        id: &str,
        event_id: &str,
        calendar_id: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE tasks SET google_event_id = ?2, google_calendar_id = ?3, last_synced_at = ?4
             WHERE id = ?1",
            params![id, event_id, calendar_id, synced_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Unlink a task from its calendar event.
    pub fn clear_sync_fields(&self, id: &str, synced_at: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "UPDATE tasks SET google_event_id = NULL, google_calendar_id = NULL,
                              last_synced_at = ?2
             WHERE id = ?1",
            params![id, synced_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Delete a task by id. Returns false when the id is unknown.
    ///
    /// Deletion does not cascade to the external calendar; callers remove
    /// the linked event explicitly when they want that.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let n = self
            .conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
