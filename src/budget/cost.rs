//! Month-to-date spend from the organization costs endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

const BASE_URL: &str = "https://api.openai.com";
const COSTS_PATH: &str = "/v1/organization/costs";
const BUCKET_WIDTH: &str = "1d";
const BUCKET_LIMIT: u32 = 180;
pub(crate) const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure to obtain spend. Never leaves the budget guard.
#[derive(Debug, Error)]
pub enum CostSourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("costs endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unparseable costs response: {0}")]
    Parse(String),

    #[error("invalid costs URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("costs request timed out after {:.1}s", .0.as_secs_f64())]
    Timeout(Duration),
}

#[async_trait]
pub trait CostSource: Send + Sync {
    /// Total spend in USD from `start` until now.
    async fn month_to_date(&self, start: DateTime<Utc>) -> Result<f64, CostSourceError>;
}

#[derive(Debug, Deserialize)]
struct CostsPage {
    #[serde(default)]
    data: Vec<CostBucket>,
}

#[derive(Debug, Deserialize)]
struct CostBucket {
    #[serde(default)]
    results: Vec<CostResult>,
}

#[derive(Debug, Deserialize)]
struct CostResult {
    #[serde(default)]
    amount: Option<CostAmount>,
}

#[derive(Debug, Deserialize)]
struct CostAmount {
    #[serde(default)]
    value: Option<serde_json::Value>,
}

impl CostsPage {
    /// Sums every numeric `amount.value`; anything else is skipped.
    ///
    /// An amount outside the decimal range, or a total that overflows it, is
    /// a parse error rather than a silently short sum.
    fn total_usd(&self) -> Result<f64, CostSourceError> {
        let total = self
            .data
            .iter()
            .flat_map(|bucket| &bucket.results)
            .filter_map(|item| item.amount.as_ref()?.value.as_ref()?.as_f64())
            .try_fold(Decimal::ZERO, |total, value| {
                let amount = Decimal::from_f64(value).ok_or_else(|| {
                    CostSourceError::Parse(format!("amount {} out of range", value))
                })?;
                total
                    .checked_add(amount)
                    .ok_or_else(|| CostSourceError::Parse("cost total overflowed".into()))
            })?;
        total
            .to_f64()
            .ok_or_else(|| CostSourceError::Parse(format!("total {} out of range", total)))
    }
}

/// Organization costs API client authenticated with an admin key.
pub struct OpenAiCostSource {
    http: reqwest::Client,
    base_url: String,
    admin_key: SecretString,
    project_id: Option<String>,
}

impl std::fmt::Debug for OpenAiCostSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCostSource")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl OpenAiCostSource {
    pub fn new(admin_key: SecretString) -> Self {
        Self {
            http: Self::build_http(DEFAULT_FETCH_TIMEOUT),
            base_url: BASE_URL.into(),
            admin_key,
            project_id: None,
        }
    }

    fn build_http(timeout: Duration) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Restricts the query to one project. Blank ids are ignored.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        let project_id = project_id.trim();
        self.project_id = (!project_id.is_empty()).then(|| project_id.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = Self::build_http(timeout);
        self
    }

    fn costs_url(&self, start: DateTime<Utc>) -> Result<url::Url, CostSourceError> {
        let mut url = url::Url::parse(&format!("{}{}", self.base_url, COSTS_PATH))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("start_time", &start.timestamp().to_string())
                .append_pair("bucket_width", BUCKET_WIDTH)
                .append_pair("limit", &BUCKET_LIMIT.to_string());
            if let Some(ref project_id) = self.project_id {
                query.append_pair("project_ids", project_id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl CostSource for OpenAiCostSource {
    async fn month_to_date(&self, start: DateTime<Utc>) -> Result<f64, CostSourceError> {
        let url = self.costs_url(start)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.admin_key.expose_secret())
            .header("content-type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CostSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let page: CostsPage =
            serde_json::from_str(&body).map_err(|e| CostSourceError::Parse(e.to_string()))?;
        page.total_usd()
    }
}
