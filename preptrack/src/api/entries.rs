use async_trait::async_trait;
use reqwest::Method;
use time::Date;

use crate::api::dto::BulkDeleteRequest;
use crate::domain::{
    format_date, BulkDeleteResult, CreateEntryBody, DayView, EntriesFilter, Entry, HistoryRange,
    PaginatedEntries, PrepCategory, SourceCount, TagCount, TaskCompletion, TopicCount,
    UpdateEntryBody, UpdateTaskStatusBody,
};
use crate::error::Result;
use crate::http::ProtectedTransport;
use crate::ports::EntryService;

/// Main-API entry endpoints.
#[derive(Debug, Clone)]
pub struct EntriesApi {
    http: ProtectedTransport,
}

impl EntriesApi {
    pub fn new(http: ProtectedTransport) -> Self {
        Self { http }
    }
}

#[async_trait]
impl EntryService for EntriesApi {
    async fn list(&self, filter: &EntriesFilter) -> Result<PaginatedEntries> {
        self.http
            .get_json(
                self.http
                    .request(Method::GET, "/entries")?
                    .query(&filter.to_query()),
                "GET /entries",
            )
            .await
    }

    async fn get(&self, id: &str) -> Result<Entry> {
        self.http
            .get_json(
                self.http.request_resource(Method::GET, "/entries", id)?,
                "GET /entries/:id",
            )
            .await
    }

    async fn create(&self, body: &CreateEntryBody) -> Result<Entry> {
        self.http
            .get_json(
                self.http.request(Method::POST, "/entries")?.json(body),
                "POST /entries",
            )
            .await
    }

    async fn update(&self, id: &str, body: &UpdateEntryBody) -> Result<Entry> {
        self.http
            .get_json(
                self.http
                    .request_resource(Method::PUT, "/entries", id)?
                    .json(body),
                "PUT /entries/:id",
            )
            .await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.http
            .send_without_body(
                self.http
                    .request_resource(Method::DELETE, "/entries", id)?,
                "DELETE /entries/:id",
            )
            .await
    }

    async fn bulk_delete(&self, ids: &[String]) -> Result<BulkDeleteResult> {
        self.http
            .get_json(
                self.http
                    .request(Method::POST, "/entries/bulk-delete")?
                    .json(&BulkDeleteRequest { ids }),
                "POST /entries/bulk-delete",
            )
            .await
    }

    async fn today(&self) -> Result<DayView> {
        self.http
            .get_json(
                self.http.request(Method::GET, "/entries/today")?,
                "GET /entries/today",
            )
            .await
    }

    async fn history_day(&self, date: Date) -> Result<DayView> {
        self.http
            .get_json(
                self.http
                    .request(Method::GET, "/entries/history")?
                    .query(&[("date", format_date(date))]),
                "GET /entries/history",
            )
            .await
    }

    async fn history_range(&self, from: Date, to: Date) -> Result<HistoryRange> {
        self.http
            .get_json(
                self.http
                    .request(Method::GET, "/entries/history")?
                    .query(&[("from", format_date(from)), ("to", format_date(to))]),
                "GET /entries/history",
            )
            .await
    }

    async fn update_task_status(&self, body: &UpdateTaskStatusBody) -> Result<TaskCompletion> {
        self.http
            .get_json(
                self.http.request(Method::POST, "/entries/status")?.json(body),
                "POST /entries/status",
            )
            .await
    }

    async fn search(&self, query: &str) -> Result<Vec<Entry>> {
        self.http
            .get_json(
                self.http
                    .request(Method::GET, "/entries/search")?
                    .query(&[("q", query)]),
                "GET /entries/search",
            )
            .await
    }

    async fn tags(&self) -> Result<Vec<TagCount>> {
        self.http
            .get_json(
                self.http.request(Method::GET, "/entries/tags")?,
                "GET /entries/tags",
            )
            .await
    }

    async fn topics(&self, category: Option<PrepCategory>) -> Result<Vec<TopicCount>> {
        let mut request = self.http.request(Method::GET, "/entries/topics")?;
        if let Some(category) = category {
            request = request.query(&[("category", category.to_string())]);
        }
        self.http.get_json(request, "GET /entries/topics").await
    }

    async fn sources(&self) -> Result<Vec<SourceCount>> {
        self.http
            .get_json(
                self.http.request(Method::GET, "/entries/sources")?,
                "GET /entries/sources",
            )
            .await
    }
}
