//! Aggregate task statistics.
//!
//! Single-pass summaries over the full task list: completion counts, an
//! overdue count, the completion rate, the mean estimate over completed
//! tasks, a trailing 7-day completion histogram, and a per-priority
//! breakdown.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Status, Task};

/// Completions on one calendar day (UTC).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCompletion {
    pub date: NaiveDate,
    pub completed: usize,
}

/// Task counts per priority level.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityStats {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Aggregate statistics over the task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    /// Percentage of completed tasks, rounded; 0 for an empty list.
    pub completion_rate: u32,
    /// Mean estimate in minutes over completed tasks, rounded; 0 when none.
    pub average_completion_time: i64,
    /// Trailing 7 days of completions, oldest first.
    pub weekly_data: Vec<DailyCompletion>,
    pub priority_stats: PriorityStats,
}

/// Compute analytics as of now.
pub fn compute(tasks: &[Task]) -> Analytics {
    compute_at(tasks, Utc::now())
}

/// Compute analytics as of an explicit reference time.
pub fn compute_at(tasks: &[Task], now: DateTime<Utc>) -> Analytics {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.status == Status::Done).count();
    let pending = total - completed;
    let overdue = tasks
        .iter()
        .filter(|t| t.status != Status::Done && t.deadline < now)
        .count();

    let completion_rate = if total > 0 {
        (completed as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };

    let average_completion_time = if completed > 0 {
        let sum: i64 = tasks
            .iter()
            .filter(|t| t.status == Status::Done)
            .map(|t| t.estimate_minutes)
            .sum();
        (sum as f64 / completed as f64).round() as i64
    } else {
        0
    };

    let today = now.date_naive();
    let mut weekly_data = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Days::new(offset);
        let completed_on_day = tasks
            .iter()
            .filter(|t| t.status == Status::Done && t.updated_at.date_naive() == date)
            .count();
        weekly_data.push(DailyCompletion {
            date,
            completed: completed_on_day,
        });
    }

    let mut priority_stats = PriorityStats::default();
    for task in tasks {
        match task.priority {
            Priority::Low => priority_stats.low += 1,
            Priority::Medium => priority_stats.medium += 1,
            Priority::High => priority_stats.high += 1,
        }
    }

    Analytics {
        total,
        completed,
        pending,
        overdue,
        completion_rate,
        average_completion_time,
        weekly_data,
        priority_stats,
    }
}
