//! Per-day task views and completion records.
//!
//! An [`Entry`] carries its own `status`, but a recurring entry is acted upon
//! once per occurrence date. Those per-date results are [`TaskCompletion`]s,
//! and the server merges them into [`ResolvedTask`]s when asked for a day.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::dates::iso_date;
use super::entry::{Entry, EntryStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub total: u32,
    pub completed: u32,
    pub in_progress: u32,
    pub pending: u32,
}

impl TaskSummary {
    pub fn from_statuses(statuses: impl IntoIterator<Item = EntryStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            summary.total += 1;
            match status {
                EntryStatus::Completed => summary.completed += 1,
                EntryStatus::InProgress => summary.in_progress += 1,
                EntryStatus::Pending => summary.pending += 1,
            }
        }
        summary
    }

    /// Completed share in percent, 0 when there is nothing to do.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.completed) * 100.0 / f64::from(self.total)
    }
}

/// An entry merged with its completion for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTask {
    #[serde(flatten)]
    pub entry: Entry,
    pub completion_id: Option<String>,
    pub completion_notes: Option<String>,
}

impl ResolvedTask {
    /// Whether this occurrence has a completion record for its date.
    ///
    /// The entry's own `status` says nothing about a specific day.
    pub fn is_acted_upon(&self) -> bool {
        self.completion_id.is_some()
    }

    pub fn status(&self) -> EntryStatus {
        self.entry.status
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub category: String,
    pub summary: TaskSummary,
    pub tasks: Vec<ResolvedTask>,
}

/// Tasks for one day, as returned by `/entries/today` and `/entries/history?date=`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayView {
    pub date: String,
    pub summary: TaskSummary,
    pub groups: Vec<TaskGroup>,
}

impl DayView {
    pub fn tasks(&self) -> impl Iterator<Item = &ResolvedTask> {
        self.groups.iter().flat_map(|group| group.tasks.iter())
    }

    pub fn find_task(&self, entry_id: &str) -> Option<&ResolvedTask> {
        self.tasks().find(|task| task.entry.id == entry_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRange {
    pub from: String,
    pub to: String,
    pub days: Vec<DayView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTaskStatusBody {
    pub entry: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    #[serde(rename = "_id")]
    pub id: String,
    pub entry: String,
    pub user_id: String,
    pub date: String,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
