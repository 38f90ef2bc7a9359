use std::str::FromStr;

use preptrack::domain::{
    date_prefix, format_date, CategoryBreakdown, DayView, Entry, EntryStatus, PasskeyCredential,
    PrepCategory, ProgressDay, ResolvedTask, Streaks, TaskSummary, User,
};

fn status_marker(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Completed => "[x]",
        EntryStatus::InProgress => "[~]",
        EntryStatus::Pending => "[ ]",
    }
}

fn category_label(raw: &str) -> String {
    PrepCategory::from_str(raw)
        .map(|c| c.label().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn deadline(entry: &Entry) -> String {
    date_prefix(&entry.deadline)
        .map(format_date)
        .unwrap_or_else(|| entry.deadline.clone())
}

pub fn entry_line(entry: &Entry) -> String {
    let mut line = format!(
        "{} {}  {} [{}] due {}",
        status_marker(entry.status),
        entry.id,
        entry.title,
        entry.category,
        deadline(entry)
    );
    if let Some(difficulty) = entry.difficulty {
        line.push_str(&format!(" ({})", difficulty.label()));
    }
    if entry.is_recurring {
        if let Some(recurrence) = &entry.recurrence {
            line.push_str(&format!(" repeats {}", recurrence.frequency));
        }
    }
    if !entry.tags.is_empty() {
        let tags: Vec<String> = entry.tags.iter().map(|t| format!("#{}", t)).collect();
        line.push_str(&format!("  {}", tags.join(" ")));
    }
    line
}

pub fn entry_details(entry: &Entry) -> String {
    let mut lines = vec![
        format!("{} ({})", entry.title, entry.id),
        format!("  Status:     {}", entry.status.label()),
        format!("  Category:   {}", entry.category.label()),
        format!("  Deadline:   {}", deadline(entry)),
    ];
    let optional = [
        ("Difficulty", entry.difficulty.map(|d| d.label().to_string())),
        ("Topic", entry.topic.clone()),
        ("Source", entry.source.clone()),
        ("URL", entry.url.clone()),
        ("Notes", entry.notes.clone()),
        ("Solution", entry.solution.clone()),
    ];
    for (label, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("  {:<11} {}", format!("{}:", label), value));
        }
    }
    if !entry.tags.is_empty() {
        lines.push(format!("  Tags:       {}", entry.tags.join(", ")));
    }
    if let Some(recurrence) = entry.recurrence.as_ref().filter(|_| entry.is_recurring) {
        let mut repeat = recurrence.frequency.to_string();
        if let Some(days) = recurrence.days_of_week.as_ref().filter(|d| !d.is_empty()) {
            let days: Vec<String> = days.iter().map(u8::to_string).collect();
            repeat.push_str(&format!(" on {}", days.join(",")));
        }
        if let Some(end) = &entry.recurring_end_date {
            repeat.push_str(&format!(" until {}", end.get(..10).unwrap_or(end)));
        }
        lines.push(format!("  Repeats:    {}", repeat));
    }
    lines.join("\n")
}

fn summary_line(summary: &TaskSummary) -> String {
    format!(
        "{}/{} done, {} in progress, {} pending ({:.0}%)",
        summary.completed,
        summary.total,
        summary.in_progress,
        summary.pending,
        summary.completion_rate()
    )
}

fn task_line(task: &ResolvedTask) -> String {
    let mut line = format!(
        "  {} {}  {}",
        status_marker(task.status()),
        task.entry.id,
        task.entry.title
    );
    if let Some(notes) = task.completion_notes.as_deref().filter(|n| !n.is_empty()) {
        line.push_str(&format!("  - {}", notes));
    }
    line
}

pub fn day_view(day: &DayView) -> String {
    if day.groups.is_empty() {
        return format!("{}: nothing scheduled", day.date);
    }
    let mut lines = vec![format!("{}: {}", day.date, summary_line(&day.summary))];
    for group in &day.groups {
        lines.push(String::new());
        lines.push(format!(
            "{} ({}/{})",
            category_label(&group.category),
            group.summary.completed,
            group.summary.total
        ));
        lines.extend(group.tasks.iter().map(task_line));
    }
    lines.join("\n")
}

pub fn user(user: &User) -> String {
    if user.username.as_deref().is_some_and(|name| name != user.email) {
        format!("{} <{}> ({})", user.display_name(), user.email, user.role)
    } else {
        format!("{} ({})", user.email, user.role)
    }
}

pub fn counts<'a>(rows: impl IntoIterator<Item = (&'a str, u64)>) -> String {
    let rows: Vec<(&str, u64)> = rows.into_iter().collect();
    if rows.is_empty() {
        return "(none)".to_string();
    }
    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(name, count)| format!("{:<width$}  {}", name, count, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn credentials(credentials: &[PasskeyCredential]) -> String {
    if credentials.is_empty() {
        return "No passkeys registered.".to_string();
    }
    credentials
        .iter()
        .map(|c| {
            let synced = if c.backed_up { ", synced" } else { "" };
            format!(
                "{}  {} ({}{}) added {}",
                c.id,
                c.display_name(),
                c.device_type,
                synced,
                c.created_at.get(..10).unwrap_or(&c.created_at)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn stats(streaks: &Streaks, categories: &[CategoryBreakdown], progress: &[ProgressDay]) -> String {
    let mut lines = vec![format!(
        "Streak: {} days (longest {}, {} active days)",
        streaks.current_streak, streaks.longest_streak, streaks.total_active_days
    )];
    if !categories.is_empty() {
        lines.push(String::new());
        for c in categories {
            lines.push(format!(
                "{:<30} {:>3}/{:<3} {:>5.1}%",
                category_label(&c.category),
                c.completed,
                c.total,
                c.completion_rate
            ));
        }
    }
    let completed: u64 = progress.iter().map(|p| p.completed).sum();
    if !progress.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "{} completed over the last {} days",
            completed,
            progress.len()
        ));
    }
    lines.join("\n")
}
