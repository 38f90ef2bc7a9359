use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use time::{Date, OffsetDateTime};

use super::dates::format_date;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntryStatus {
    Pending,
    InProgress,
    Completed,
}

impl EntryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "Pending",
            EntryStatus::InProgress => "In Progress",
            EntryStatus::Completed => "Completed",
        }
    }
}

/// Interview preparation area. Declaration order is display order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PrepCategory {
    Dsa,
    SystemDesign,
    Behavioral,
    MachineCoding,
    LanguageFramework,
}

impl PrepCategory {
    pub fn label(&self) -> &'static str {
        match self {
            PrepCategory::Dsa => "Data Structures & Algorithms",
            PrepCategory::SystemDesign => "System Design",
            PrepCategory::Behavioral => "Behavioral",
            PrepCategory::MachineCoding => "Machine Coding",
            PrepCategory::LanguageFramework => "Language & Framework",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PrepCategory::Dsa => "Coding problems, algorithmic thinking, and data structure usage",
            PrepCategory::SystemDesign => {
                "Designing scalable systems, architecture, and trade-off analysis"
            }
            PrepCategory::Behavioral => "Behavioral and situational interview questions",
            PrepCategory::MachineCoding => {
                "Live coding rounds building small applications or features"
            }
            PrepCategory::LanguageFramework => "Language-specific and framework-specific knowledge",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,
    /// 0 = Sunday through 6 = Saturday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
}

/// A study item as stored by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    pub status: EntryStatus,
    pub category: PrepCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub user_id: String,
    pub deadline: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_end_date: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryBody {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
    pub category: PrepCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub deadline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_end_date: Option<String>,
}

impl CreateEntryBody {
    pub fn new(title: impl Into<String>, category: PrepCategory, deadline: Date) -> Self {
        Self {
            title: title.into(),
            notes: None,
            solution: None,
            status: None,
            category,
            topic: None,
            difficulty: None,
            source: None,
            url: None,
            tags: None,
            deadline: format_date(deadline),
            is_recurring: None,
            recurrence: None,
            recurring_end_date: None,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(dedup_tags(tags));
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn recurring(mut self, recurrence: Recurrence, until: Option<Date>) -> Self {
        self.is_recurring = Some(true);
        self.recurrence = Some(recurrence);
        self.recurring_end_date = until.map(format_date);
        self
    }
}

/// Patch body: only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PrepCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_end_date: Option<String>,
}

impl UpdateEntryBody {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Keeps the first occurrence of each tag, dropping blanks.
pub fn dedup_tags<I, T>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.into().trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntriesFilter {
    pub category: Option<PrepCategory>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<EntryStatus>,
    pub source: Option<String>,
    pub tag: Option<String>,
    pub date: Option<Date>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl EntriesFilter {
    /// Query parameters for the set fields, in a stable order.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(category) = self.category {
            params.push(("category", category.to_string()));
        }
        if let Some(topic) = non_empty(&self.topic) {
            params.push(("topic", topic));
        }
        if let Some(difficulty) = self.difficulty {
            params.push(("difficulty", difficulty.to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        if let Some(source) = non_empty(&self.source) {
            params.push(("source", source));
        }
        if let Some(tag) = non_empty(&self.tag) {
            params.push(("tag", tag));
        }
        if let Some(date) = self.date {
            params.push(("date", format_date(date)));
        }
        if let Some(from) = self.from {
            params.push(("from", format_date(from)));
        }
        if let Some(to) = self.to {
            params.push(("to", format_date(to)));
        }
        if let Some(page) = self.page.filter(|p| *p > 0) {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedEntries {
    pub entries: Vec<Entry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResult {
    pub message: String,
    pub deleted_count: u64,
}
