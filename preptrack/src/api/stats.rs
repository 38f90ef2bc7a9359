use reqwest::Method;

use crate::domain::{CategoryBreakdown, DifficultyBreakdown, Overview, ProgressDay, Streaks};
use crate::error::Result;
use crate::http::ProtectedTransport;

pub const DEFAULT_PROGRESS_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct StatsApi {
    http: ProtectedTransport,
}

impl StatsApi {
    pub fn new(http: ProtectedTransport) -> Self {
        Self { http }
    }

    pub async fn overview(&self) -> Result<Overview> {
        self.http
            .get_json(
                self.http.request(Method::GET, "/stats/overview")?,
                "GET /stats/overview",
            )
            .await
    }

    pub async fn categories(&self) -> Result<Vec<CategoryBreakdown>> {
        self.http
            .get_json(
                self.http.request(Method::GET, "/stats/categories")?,
                "GET /stats/categories",
            )
            .await
    }

    pub async fn difficulties(&self) -> Result<Vec<DifficultyBreakdown>> {
        self.http
            .get_json(
                self.http.request(Method::GET, "/stats/difficulties")?,
                "GET /stats/difficulties",
            )
            .await
    }

    pub async fn streaks(&self) -> Result<Streaks> {
        self.http
            .get_json(
                self.http.request(Method::GET, "/stats/streaks")?,
                "GET /stats/streaks",
            )
            .await
    }

    /// Completions per day over the last `days` days.
    pub async fn progress(&self, days: u32) -> Result<Vec<ProgressDay>> {
        self.http
            .get_json(
                self.http
                    .request(Method::GET, "/stats/progress")?
                    .query(&[("days", days)]),
                "GET /stats/progress",
            )
            .await
    }
}
