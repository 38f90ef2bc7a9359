//! In-memory backend for tests and offline use.
//!
//! Implements both [`AuthService`] and [`EntryService`] against a shared,
//! clonable store, resolving days with [`crate::recurrence`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::api::dto::{LoginResponse, LoginUser, PasskeyChallenge, RegisterResponse, RegisteredUser};
use crate::domain::{
    date_prefix, format_date, BulkDeleteResult, CreateEntryBody, DayView, EntriesFilter, Entry,
    EntryStatus, HistoryRange, PaginatedEntries, Pagination, PrepCategory, SourceCount, TagCount,
    TaskCompletion, TopicCount, UpdateEntryBody, UpdateTaskStatusBody,
};
use crate::error::{ClientError, Result};
use crate::ports::{AuthService, EntryService, PlatformAuthenticator};
use crate::recurrence::resolve_day;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MOCK_USER_ID: &str = "mock-user";

#[derive(Debug, Clone)]
struct MockAccount {
    id: String,
    email: String,
    password: String,
}

#[derive(Debug)]
struct MockState {
    accounts: Vec<MockAccount>,
    /// credential id -> email
    passkeys: HashMap<String, String>,
    challenges: HashSet<String>,
    entries: Vec<Entry>,
    completions: Vec<TaskCompletion>,
    today: Date,
    next_id: u64,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn now(&self) -> OffsetDateTime {
        self.today.midnight().assume_utc()
    }

    fn login_response(&mut self, email: &str, username: Option<String>) -> Option<LoginResponse> {
        let account = self.accounts.iter().find(|a| a.email == email)?.clone();
        let token = self.next_id("mock-token");
        Some(LoginResponse {
            access_token: token,
            refresh_token: Some("mock-refresh".to_string()),
            user: LoginUser {
                id: account.id,
                username,
                role: "user".to_string(),
            },
        })
    }
}

/// Shared in-memory backend. Clones see the same data.
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<RwLock<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn status_error(status: u16, message: &str) -> ClientError {
    ClientError::Status {
        status,
        message: message.to_string(),
    }
}

fn not_found() -> ClientError {
    status_error(404, "Entry not found")
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState {
                accounts: Vec::new(),
                passkeys: HashMap::new(),
                challenges: HashSet::new(),
                entries: Vec::new(),
                completions: Vec::new(),
                today: OffsetDateTime::now_utc().date(),
                next_id: 0,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an account that can sign in with `password`.
    pub fn with_user(self, email: &str, password: &str) -> Self {
        {
            let mut state = self.write();
            let id = state.next_id("user");
            state.accounts.push(MockAccount {
                id,
                email: email.to_string(),
                password: password.to_string(),
            });
        }
        self
    }

    /// Register a passkey credential id for an existing account.
    pub fn with_passkey(self, credential_id: &str, email: &str) -> Self {
        self.write()
            .passkeys
            .insert(credential_id.to_string(), email.to_string());
        self
    }

    /// Fix the backend's notion of "today". Also used as the creation time of new entries.
    pub fn with_today(self, today: Date) -> Self {
        self.write().today = today;
        self
    }

    pub fn with_entries(self, entries: Vec<Entry>) -> Self {
        self.write().entries.extend(entries);
        self
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.read().entries.clone()
    }

    pub fn completions(&self) -> Vec<TaskCompletion> {
        self.read().completions.clone()
    }

    fn matches(entry: &Entry, filter: &EntriesFilter) -> bool {
        let deadline = date_prefix(&entry.deadline);
        filter.category.map_or(true, |c| entry.category == c)
            && filter.difficulty.map_or(true, |d| entry.difficulty == Some(d))
            && filter.status.map_or(true, |s| entry.status == s)
            && filter
                .topic
                .as_ref()
                .map_or(true, |t| entry.topic.as_ref() == Some(t))
            && filter
                .source
                .as_ref()
                .map_or(true, |s| entry.source.as_ref() == Some(s))
            && filter.tag.as_ref().map_or(true, |t| entry.tags.contains(t))
            && filter.date.map_or(true, |d| deadline == Some(d))
            && filter.from.map_or(true, |from| deadline.is_some_and(|d| d >= from))
            && filter.to.map_or(true, |to| deadline.is_some_and(|d| d <= to))
    }
}

fn counts<'a>(values: impl Iterator<Item = &'a String>) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for value in values {
        *counts.entry(value.clone()).or_default() += 1;
    }
    let mut counts: Vec<(String, u64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[async_trait]
impl AuthService for MockBackend {
    async fn register(&self, email: &str, password: &str) -> Result<RegisterResponse> {
        let mut state = self.write();
        if state.accounts.iter().any(|a| a.email == email) {
            return Err(status_error(409, "User already exists"));
        }
        let id = state.next_id("user");
        state.accounts.push(MockAccount {
            id: id.clone(),
            email: email.to_string(),
            password: password.to_string(),
        });
        Ok(RegisterResponse {
            message: "User registered".to_string(),
            user: RegisteredUser {
                email: email.to_string(),
                id,
            },
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let mut state = self.write();
        let valid = state
            .accounts
            .iter()
            .any(|a| a.email == email && a.password == password);
        if !valid {
            return Err(status_error(401, "Invalid credentials"));
        }
        state
            .login_response(email, None)
            .ok_or_else(|| status_error(401, "Invalid credentials"))
    }

    async fn passkey_login_options(&self, email: Option<&str>) -> Result<PasskeyChallenge> {
        let mut state = self.write();
        let challenge_id = state.next_id("challenge");
        state.challenges.insert(challenge_id.clone());

        let allowed: Vec<serde_json::Value> = state
            .passkeys
            .iter()
            .filter(|(_, owner)| email.map_or(true, |e| e == owner.as_str()))
            .map(|(id, _)| serde_json::json!({ "id": id, "type": "public-key" }))
            .collect();

        Ok(PasskeyChallenge {
            options: serde_json::json!({
                "challenge": challenge_id,
                "rpId": "localhost",
                "allowCredentials": allowed,
            }),
            challenge_id,
        })
    }

    async fn passkey_login_verify(
        &self,
        challenge_id: &str,
        credential: &serde_json::Value,
    ) -> Result<LoginResponse> {
        let mut state = self.write();
        if !state.challenges.remove(challenge_id) {
            return Err(status_error(400, "Challenge expired or unknown"));
        }
        let email = credential
            .get("id")
            .and_then(|id| id.as_str())
            .and_then(|id| state.passkeys.get(id))
            .cloned()
            .ok_or_else(|| status_error(401, "Passkey not recognized"))?;
        state
            .login_response(&email, Some(email.clone()))
            .ok_or_else(|| status_error(401, "Passkey not recognized"))
    }
}

#[async_trait]
impl EntryService for MockBackend {
    async fn list(&self, filter: &EntriesFilter) -> Result<PaginatedEntries> {
        let state = self.read();
        let matching: Vec<Entry> = state
            .entries
            .iter()
            .filter(|e| Self::matches(e, filter))
            .cloned()
            .collect();

        let page = filter.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = filter.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        let total = matching.len() as u64;
        let total_pages = total.div_ceil(u64::from(limit)) as u32;
        let entries = matching
            .into_iter()
            .skip((page as usize - 1).saturating_mul(limit as usize))
            .take(limit as usize)
            .collect();

        Ok(PaginatedEntries {
            entries,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        })
    }

    async fn get(&self, id: &str) -> Result<Entry> {
        self.read()
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create(&self, body: &CreateEntryBody) -> Result<Entry> {
        if body.title.trim().is_empty() {
            return Err(status_error(400, "Title is required"));
        }
        let mut state = self.write();
        let now = state.now();
        let entry = Entry {
            id: state.next_id("entry"),
            title: body.title.clone(),
            notes: body.notes.clone(),
            solution: body.solution.clone(),
            status: body.status.unwrap_or(EntryStatus::Pending),
            category: body.category,
            topic: body.topic.clone(),
            difficulty: body.difficulty,
            source: body.source.clone(),
            url: body.url.clone(),
            tags: body.tags.clone().unwrap_or_default(),
            user_id: MOCK_USER_ID.to_string(),
            deadline: body.deadline.clone(),
            is_recurring: body.is_recurring.unwrap_or(false),
            recurrence: body.recurrence.clone(),
            recurring_end_date: body.recurring_end_date.clone(),
            created_at: now,
            updated_at: now,
        };
        state.entries.insert(0, entry.clone());
        Ok(entry)
    }

    async fn update(&self, id: &str, body: &UpdateEntryBody) -> Result<Entry> {
        let mut state = self.write();
        let now = state.now();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(not_found)?;

        let patch = body.clone();
        if let Some(title) = patch.title {
            entry.title = title;
        }
        if patch.notes.is_some() {
            entry.notes = patch.notes;
        }
        if patch.solution.is_some() {
            entry.solution = patch.solution;
        }
        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(category) = patch.category {
            entry.category = category;
        }
        if patch.topic.is_some() {
            entry.topic = patch.topic;
        }
        if patch.difficulty.is_some() {
            entry.difficulty = patch.difficulty;
        }
        if patch.source.is_some() {
            entry.source = patch.source;
        }
        if patch.url.is_some() {
            entry.url = patch.url;
        }
        if let Some(tags) = patch.tags {
            entry.tags = tags;
        }
        if let Some(deadline) = patch.deadline {
            entry.deadline = deadline;
        }
        if let Some(is_recurring) = patch.is_recurring {
            entry.is_recurring = is_recurring;
        }
        if patch.recurrence.is_some() {
            entry.recurrence = patch.recurrence;
        }
        if patch.recurring_end_date.is_some() {
            entry.recurring_end_date = patch.recurring_end_date;
        }
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.write();
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        if state.entries.len() == before {
            return Err(not_found());
        }
        state.completions.retain(|c| c.entry != id);
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[String]) -> Result<BulkDeleteResult> {
        let mut state = self.write();
        let before = state.entries.len();
        state.entries.retain(|e| !ids.contains(&e.id));
        state.completions.retain(|c| !ids.contains(&c.entry));
        let deleted_count = (before - state.entries.len()) as u64;
        Ok(BulkDeleteResult {
            message: format!("Deleted {} entries", deleted_count),
            deleted_count,
        })
    }

    async fn today(&self) -> Result<DayView> {
        let state = self.read();
        Ok(resolve_day(&state.entries, &state.completions, state.today))
    }

    async fn history_day(&self, date: Date) -> Result<DayView> {
        let state = self.read();
        Ok(resolve_day(&state.entries, &state.completions, date))
    }

    async fn history_range(&self, from: Date, to: Date) -> Result<HistoryRange> {
        if from > to {
            return Err(status_error(400, "Invalid date range"));
        }
        let state = self.read();
        let mut days = Vec::new();
        let mut day = from;
        while day <= to {
            days.push(resolve_day(&state.entries, &state.completions, day));
            match day.next_day() {
                Some(next) => day = next,
                None => break,
            }
        }
        Ok(HistoryRange {
            from: format_date(from),
            to: format_date(to),
            days,
        })
    }

    async fn update_task_status(&self, body: &UpdateTaskStatusBody) -> Result<TaskCompletion> {
        let mut state = self.write();
        if !state.entries.iter().any(|e| e.id == body.entry) {
            return Err(not_found());
        }
        let now = state.now();
        let date = format_date(body.date);

        if let Some(existing) = state
            .completions
            .iter_mut()
            .find(|c| c.entry == body.entry && c.date == date)
        {
            existing.status = body.status;
            existing.notes = body.notes.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let completion = TaskCompletion {
            id: state.next_id("completion"),
            entry: body.entry.clone(),
            user_id: MOCK_USER_ID.to_string(),
            date,
            status: body.status,
            notes: body.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        state.completions.push(completion.clone());
        Ok(completion)
    }

    async fn search(&self, query: &str) -> Result<Vec<Entry>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let contains = |value: &Option<String>| {
            value
                .as_ref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        };
        Ok(self
            .read()
            .entries
            .iter()
            .filter(|e| {
                e.title.to_lowercase().contains(&needle)
                    || contains(&e.notes)
                    || contains(&e.topic)
                    || e.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn tags(&self) -> Result<Vec<TagCount>> {
        let state = self.read();
        Ok(counts(state.entries.iter().flat_map(|e| e.tags.iter()))
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect())
    }

    async fn topics(&self, category: Option<PrepCategory>) -> Result<Vec<TopicCount>> {
        let state = self.read();
        Ok(counts(
            state
                .entries
                .iter()
                .filter(|e| category.map_or(true, |c| e.category == c))
                .filter_map(|e| e.topic.as_ref()),
        )
        .into_iter()
        .map(|(topic, count)| TopicCount { topic, count })
        .collect())
    }

    async fn sources(&self) -> Result<Vec<SourceCount>> {
        let state = self.read();
        Ok(counts(state.entries.iter().filter_map(|e| e.source.as_ref()))
            .into_iter()
            .map(|(source, count)| SourceCount { source, count })
            .collect())
    }
}

/// Authenticator that answers every ceremony with a fixed credential id.
#[derive(Debug, Clone)]
pub struct MockAuthenticator {
    credential_id: Option<String>,
}

impl MockAuthenticator {
    pub fn new(credential_id: &str) -> Self {
        Self {
            credential_id: Some(credential_id.to_string()),
        }
    }

    /// An authenticator whose user dismisses the prompt.
    pub fn cancelled() -> Self {
        Self {
            credential_id: None,
        }
    }

    fn credential(&self) -> Result<serde_json::Value> {
        match &self.credential_id {
            Some(id) => Ok(serde_json::json!({ "id": id, "rawId": id, "type": "public-key" })),
            None => Err(ClientError::authenticator("ceremony cancelled by user")),
        }
    }
}

#[async_trait]
impl PlatformAuthenticator for MockAuthenticator {
    async fn authenticate(&self, _options: &serde_json::Value) -> Result<serde_json::Value> {
        self.credential()
    }

    async fn register(&self, _options: &serde_json::Value) -> Result<serde_json::Value> {
        self.credential()
    }
}
