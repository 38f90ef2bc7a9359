//! Reference resolution of entries into per-day tasks.
//!
//! The API resolves occurrences server-side; this module encodes the same
//! contract so the in-memory backend answers `today` and `history` the way the
//! server does.
//!
//! - A non-recurring entry occurs on its deadline date.
//! - `daily` occurs every day from creation until `recurringEndDate`.
//! - `weekly` occurs on `daysOfWeek`, or on the deadline's weekday when none
//!   are listed.
//! - `custom` occurs only on `daysOfWeek`.

use time::Date;

use crate::domain::{
    date_prefix, format_date, DayView, Entry, EntryStatus, PrepCategory, RecurrenceFrequency,
    ResolvedTask, TaskCompletion, TaskGroup, TaskSummary,
};
use strum::IntoEnumIterator;

pub fn occurs_on(entry: &Entry, date: Date) -> bool {
    if !entry.is_recurring {
        return date_prefix(&entry.deadline) == Some(date);
    }
    let Some(recurrence) = &entry.recurrence else {
        return date_prefix(&entry.deadline) == Some(date);
    };

    if date < entry.created_at.date() {
        return false;
    }
    if let Some(end) = entry.recurring_end_date.as_deref().and_then(date_prefix) {
        if date > end {
            return false;
        }
    }

    let weekday = date.weekday().number_days_from_sunday();
    let listed = recurrence
        .days_of_week
        .as_ref()
        .filter(|days| !days.is_empty());

    match recurrence.frequency {
        RecurrenceFrequency::Daily => true,
        RecurrenceFrequency::Weekly => match listed {
            Some(days) => days.contains(&weekday),
            None => date_prefix(&entry.deadline)
                .map(|deadline| deadline.weekday().number_days_from_sunday() == weekday)
                .unwrap_or(false),
        },
        RecurrenceFrequency::Custom => listed.map(|days| days.contains(&weekday)).unwrap_or(false),
    }
}

/// Merge an occurring entry with its completion for `date`, if any.
pub fn resolve(entry: &Entry, completions: &[TaskCompletion], date: Date) -> ResolvedTask {
    let completion = completions
        .iter()
        .find(|c| c.entry == entry.id && date_prefix(&c.date) == Some(date));

    let mut resolved = entry.clone();
    resolved.status = match (completion, entry.is_recurring) {
        (Some(completion), _) => completion.status,
        (None, true) => EntryStatus::Pending,
        (None, false) => entry.status,
    };

    ResolvedTask {
        entry: resolved,
        completion_id: completion.map(|c| c.id.clone()),
        completion_notes: completion.and_then(|c| c.notes.clone()),
    }
}

/// All tasks for one date, grouped by category in declaration order.
pub fn resolve_day(entries: &[Entry], completions: &[TaskCompletion], date: Date) -> DayView {
    let tasks: Vec<ResolvedTask> = entries
        .iter()
        .filter(|entry| occurs_on(entry, date))
        .map(|entry| resolve(entry, completions, date))
        .collect();

    let groups: Vec<TaskGroup> = PrepCategory::iter()
        .filter_map(|category| {
            let group_tasks: Vec<ResolvedTask> = tasks
                .iter()
                .filter(|task| task.entry.category == category)
                .cloned()
                .collect();
            if group_tasks.is_empty() {
                return None;
            }
            Some(TaskGroup {
                category: category.to_string(),
                summary: TaskSummary::from_statuses(group_tasks.iter().map(|t| t.status())),
                tasks: group_tasks,
            })
        })
        .collect();

    DayView {
        date: format_date(date),
        summary: TaskSummary::from_statuses(tasks.iter().map(|t| t.status())),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Recurrence;
    use time::macros::{date, datetime};

    fn entry(id: &str, category: PrepCategory, deadline: &str) -> Entry {
        Entry {
            id: id.to_string(),
            title: format!("Entry {}", id),
            notes: None,
            solution: None,
            status: EntryStatus::Pending,
            category,
            topic: None,
            difficulty: None,
            source: None,
            url: None,
            tags: vec![],
            user_id: "u1".to_string(),
            deadline: deadline.to_string(),
            is_recurring: false,
            recurrence: None,
            recurring_end_date: None,
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    fn recurring(mut e: Entry, frequency: RecurrenceFrequency, days: Option<Vec<u8>>) -> Entry {
        e.is_recurring = true;
        e.recurrence = Some(Recurrence {
            frequency,
            days_of_week: days,
        });
        e
    }

    fn completion(entry: &str, date: &str, status: EntryStatus) -> TaskCompletion {
        TaskCompletion {
            id: format!("c-{}-{}", entry, date),
            entry: entry.to_string(),
            user_id: "u1".to_string(),
            date: date.to_string(),
            status,
            notes: Some("done quickly".to_string()),
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    #[test]
    fn one_off_entry_occurs_on_deadline_only() {
        let e = entry("e1", PrepCategory::Dsa, "2024-01-03T00:00:00.000Z");
        assert!(occurs_on(&e, date!(2024 - 01 - 03)));
        assert!(!occurs_on(&e, date!(2024 - 01 - 04)));
    }

    #[test]
    fn daily_respects_creation_and_end_date() {
        let mut e = recurring(
            entry("e1", PrepCategory::Dsa, "2024-01-01"),
            RecurrenceFrequency::Daily,
            None,
        );
        e.recurring_end_date = Some("2024-01-10".to_string());
        assert!(!occurs_on(&e, date!(2023 - 12 - 31)));
        assert!(occurs_on(&e, date!(2024 - 01 - 01)));
        assert!(occurs_on(&e, date!(2024 - 01 - 10)));
        assert!(!occurs_on(&e, date!(2024 - 01 - 11)));
    }

    #[test]
    fn weekly_uses_listed_days_or_deadline_weekday() {
        // 2024-01-01 is a Monday.
        let listed = recurring(
            entry("e1", PrepCategory::Dsa, "2024-01-01"),
            RecurrenceFrequency::Weekly,
            Some(vec![2, 4]),
        );
        assert!(occurs_on(&listed, date!(2024 - 01 - 02)));
        assert!(!occurs_on(&listed, date!(2024 - 01 - 08)));

        let implicit = recurring(
            entry("e2", PrepCategory::Dsa, "2024-01-01"),
            RecurrenceFrequency::Weekly,
            None,
        );
        assert!(occurs_on(&implicit, date!(2024 - 01 - 08)));
        assert!(!occurs_on(&implicit, date!(2024 - 01 - 09)));
    }

    #[test]
    fn custom_without_days_never_occurs() {
        let e = recurring(
            entry("e1", PrepCategory::Dsa, "2024-01-01"),
            RecurrenceFrequency::Custom,
            None,
        );
        assert!(!occurs_on(&e, date!(2024 - 01 - 01)));
    }

    #[test]
    fn recurring_task_status_comes_from_that_days_completion() {
        let mut e = recurring(
            entry("e1", PrepCategory::Dsa, "2024-01-01"),
            RecurrenceFrequency::Daily,
            None,
        );
        e.status = EntryStatus::Completed;
        let completions = vec![completion("e1", "2024-01-02", EntryStatus::InProgress)];

        let untouched = resolve(&e, &completions, date!(2024 - 01 - 01));
        assert_eq!(untouched.status(), EntryStatus::Pending);
        assert!(!untouched.is_acted_upon());

        let acted = resolve(&e, &completions, date!(2024 - 01 - 02));
        assert_eq!(acted.status(), EntryStatus::InProgress);
        assert_eq!(acted.completion_id.as_deref(), Some("c-e1-2024-01-02"));
        assert_eq!(acted.completion_notes.as_deref(), Some("done quickly"));
    }

    #[test]
    fn day_groups_follow_category_order_with_summaries() {
        let entries = vec![
            entry("b1", PrepCategory::Behavioral, "2024-01-01"),
            entry("d1", PrepCategory::Dsa, "2024-01-01"),
            entry("d2", PrepCategory::Dsa, "2024-01-01"),
            entry("later", PrepCategory::Dsa, "2024-02-01"),
        ];
        let completions = vec![completion("d2", "2024-01-01", EntryStatus::Completed)];

        let day = resolve_day(&entries, &completions, date!(2024 - 01 - 01));
        assert_eq!(day.date, "2024-01-01");
        let categories: Vec<&str> = day.groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, vec!["dsa", "behavioral"]);
        assert_eq!(day.groups[0].summary.total, 2);
        assert_eq!(day.groups[0].summary.completed, 1);
        assert_eq!(day.summary.total, 3);
        assert!(day.find_task("later").is_none());
    }
}
