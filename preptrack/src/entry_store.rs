//! Cached view of the user's entries and today's tasks.
//!
//! Loading and error state is tracked per [`EntryOp`], so one failing call
//! does not hide or overwrite the state of another that is still in flight.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{
    CreateEntryBody, DayView, EntriesFilter, Entry, Pagination, TaskCompletion, UpdateEntryBody,
    UpdateTaskStatusBody,
};
use crate::error::{ClientError, Result};
use crate::ports::EntryService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryOp {
    Fetch,
    Create,
    Update,
    Delete,
    FetchToday,
    UpdateTaskStatus,
}

impl EntryOp {
    fn fallback_message(&self) -> &'static str {
        match self {
            EntryOp::Fetch => "Failed to fetch entries",
            EntryOp::Create => "Failed to create entry",
            EntryOp::Update => "Failed to update entry",
            EntryOp::Delete => "Failed to delete entry",
            EntryOp::FetchToday => "Failed to fetch today's tasks",
            EntryOp::UpdateTaskStatus => "Failed to update task status",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryState {
    pub entries: Vec<Entry>,
    pub pagination: Option<Pagination>,
    pub today: Option<DayView>,
    loading: HashMap<EntryOp, usize>,
    errors: HashMap<EntryOp, String>,
    last_error: Option<EntryOp>,
    fetch_generation: u64,
}

impl EntryState {
    pub fn is_loading(&self) -> bool {
        self.loading.values().any(|count| *count > 0)
    }

    pub fn is_loading_op(&self, op: EntryOp) -> bool {
        self.loading.get(&op).is_some_and(|count| *count > 0)
    }

    pub fn error(&self, op: EntryOp) -> Option<&str> {
        self.errors.get(&op).map(String::as_str)
    }

    /// The most recently recorded error that has not been cleared.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.and_then(|op| self.error(op))
    }

    pub fn failed_ops(&self) -> HashSet<EntryOp> {
        self.errors.keys().copied().collect()
    }
}

/// Entry cache in front of an [`EntryService`].
pub struct EntryStore<S> {
    service: S,
    state: Arc<Mutex<EntryState>>,
}

impl<S: EntryService> EntryStore<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(EntryState::default())),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn lock(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> EntryState {
        self.lock().clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.lock().entries.clone()
    }

    pub fn today(&self) -> Option<DayView> {
        self.lock().today.clone()
    }

    fn begin(&self, op: EntryOp) {
        let mut state = self.lock();
        *state.loading.entry(op).or_default() += 1;
        state.errors.remove(&op);
        if state.last_error == Some(op) {
            state.last_error = None;
        }
    }

    fn end(state: &mut EntryState, op: EntryOp) {
        if let Some(count) = state.loading.get_mut(&op) {
            *count = count.saturating_sub(1);
        }
    }

    fn fail(&self, op: EntryOp, err: &ClientError) {
        let mut state = self.lock();
        Self::end(&mut state, op);
        let message = err.to_string();
        let message = if message.trim().is_empty() {
            op.fallback_message().to_string()
        } else {
            message
        };
        tracing::debug!("{:?} failed: {}", op, message);
        state.errors.insert(op, message);
        state.last_error = Some(op);
    }

    /// Load a page of entries.
    ///
    /// When fetches overlap, only the most recently started one updates the
    /// cache; an older response that arrives late is discarded.
    pub async fn fetch_entries(&self, filter: &EntriesFilter) -> Result<()> {
        self.begin(EntryOp::Fetch);
        let generation = {
            let mut state = self.lock();
            state.fetch_generation += 1;
            state.fetch_generation
        };

        match self.service.list(filter).await {
            Ok(page) => {
                let mut state = self.lock();
                Self::end(&mut state, EntryOp::Fetch);
                if state.fetch_generation == generation {
                    state.entries = page.entries;
                    state.pagination = Some(page.pagination);
                } else {
                    tracing::debug!("Dropping stale entries response");
                }
                Ok(())
            }
            Err(e) => {
                self.fail(EntryOp::Fetch, &e);
                Err(e)
            }
        }
    }

    /// Create an entry and put it at the front of the cache.
    pub async fn create_entry(&self, body: &CreateEntryBody) -> Result<Entry> {
        self.begin(EntryOp::Create);
        match self.service.create(body).await {
            Ok(created) => {
                let mut state = self.lock();
                Self::end(&mut state, EntryOp::Create);
                state.entries.insert(0, created.clone());
                Ok(created)
            }
            Err(e) => {
                self.fail(EntryOp::Create, &e);
                Err(e)
            }
        }
    }

    pub async fn update_entry(&self, id: &str, body: &UpdateEntryBody) -> Result<Entry> {
        self.begin(EntryOp::Update);
        match self.service.update(id, body).await {
            Ok(updated) => {
                let mut state = self.lock();
                Self::end(&mut state, EntryOp::Update);
                for entry in state.entries.iter_mut().filter(|e| e.id == id) {
                    *entry = updated.clone();
                }
                Ok(updated)
            }
            Err(e) => {
                self.fail(EntryOp::Update, &e);
                Err(e)
            }
        }
    }

    pub async fn delete_entry(&self, id: &str) -> Result<()> {
        self.begin(EntryOp::Delete);
        match self.service.delete(id).await {
            Ok(()) => {
                let mut state = self.lock();
                Self::end(&mut state, EntryOp::Delete);
                state.entries.retain(|e| e.id != id);
                Ok(())
            }
            Err(e) => {
                self.fail(EntryOp::Delete, &e);
                Err(e)
            }
        }
    }

    pub async fn fetch_today(&self) -> Result<DayView> {
        self.begin(EntryOp::FetchToday);
        match self.service.today().await {
            Ok(today) => {
                let mut state = self.lock();
                Self::end(&mut state, EntryOp::FetchToday);
                state.today = Some(today.clone());
                Ok(today)
            }
            Err(e) => {
                self.fail(EntryOp::FetchToday, &e);
                Err(e)
            }
        }
    }

    /// Record a per-day status. The cached today view is not refreshed.
    pub async fn update_task_status(&self, body: &UpdateTaskStatusBody) -> Result<TaskCompletion> {
        self.begin(EntryOp::UpdateTaskStatus);
        match self.service.update_task_status(body).await {
            Ok(completion) => {
                Self::end(&mut self.lock(), EntryOp::UpdateTaskStatus);
                Ok(completion)
            }
            Err(e) => {
                self.fail(EntryOp::UpdateTaskStatus, &e);
                Err(e)
            }
        }
    }

    pub fn clear_error(&self) {
        let mut state = self.lock();
        state.errors.clear();
        state.last_error = None;
    }
}
