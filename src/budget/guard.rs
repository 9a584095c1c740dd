//! Monthly spend guard with a month- and TTL-bounded cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::clock::{Clock, SystemClock, month_key, month_start};
use super::cost::{CostSource, CostSourceError, DEFAULT_FETCH_TIMEOUT, OpenAiCostSource};
use crate::config::Settings;
use crate::{Error, Result};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetConfig {
    pub budget_usd: f64,
    pub cache_ttl: Duration,
    /// Upper bound on a single cost-source call, independent of request timeouts.
    pub fetch_timeout: Duration,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            budget_usd: 5.0,
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl BudgetConfig {
    pub fn new(budget_usd: f64) -> Self {
        Self {
            budget_usd,
            ..Default::default()
        }
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Month-to-date spend as seen by the guard.
///
/// `hard_cap_active` is true only when `spent_usd` came from a successful
/// cost-source call; otherwise spend is unknown and reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    #[serde(rename = "month")]
    pub month_key: String,
    pub spent_usd: f64,
    pub budget_usd: f64,
    pub hard_cap_active: bool,
}

impl BudgetStatus {
    pub fn is_exceeded(&self) -> bool {
        self.hard_cap_active && self.spent_usd >= self.budget_usd
    }

    pub fn remaining_usd(&self) -> f64 {
        (self.budget_usd - self.spent_usd).max(0.0)
    }
}

#[derive(Debug, Clone)]
struct CachedSpend {
    month_key: String,
    spent_usd: f64,
    fetched_at: DateTime<Utc>,
    hard_cap_active: bool,
}

impl CachedSpend {
    fn is_fresh(&self, month_key: &str, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        self.month_key == month_key && now - self.fetched_at < ttl
    }
}

/// Gates a metered backend behind a monthly spend cap.
///
/// The cost source is consulted at most once per TTL window per month. When it
/// is missing or failing the guard fails open: spend is reported as zero and
/// the hard cap is inactive.
pub struct BudgetGuard {
    config: BudgetConfig,
    source: Option<Arc<dyn CostSource>>,
    clock: Arc<dyn Clock>,
    cache: Mutex<Option<CachedSpend>>,
}

impl std::fmt::Debug for BudgetGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetGuard")
            .field("config", &self.config)
            .field("has_cost_source", &self.source.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}

impl BudgetGuard {
    /// Guard without a cost source; it never blocks.
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            source: None,
            clock: Arc::new(SystemClock),
            cache: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let config = BudgetConfig::new(settings.monthly_budget_usd)
            .cache_ttl(Duration::from_secs(settings.budget_cache_seconds));
        let guard = Self::new(config);

        match settings.openai_admin_key {
            Some(ref admin_key) if !admin_key.expose_secret().trim().is_empty() => {
                let mut source = OpenAiCostSource::new(admin_key.clone())
                    .with_base_url(settings.openai_base_url.clone())
                    .with_timeout(config.fetch_timeout);
                if let Some(ref project_id) = settings.openai_project_id {
                    source = source.with_project_id(project_id.clone());
                }
                guard.with_cost_source(Arc::new(source))
            }
            _ => guard,
        }
    }

    pub fn with_cost_source(mut self, source: Arc<dyn CostSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    pub fn has_cost_source(&self) -> bool {
        self.source.is_some()
    }

    fn status_from(&self, entry: &CachedSpend) -> BudgetStatus {
        BudgetStatus {
            month_key: entry.month_key.clone(),
            spent_usd: entry.spent_usd,
            budget_usd: self.config.budget_usd,
            hard_cap_active: entry.hard_cap_active,
        }
    }

    async fn fetch(
        &self,
        source: &dyn CostSource,
        start: DateTime<Utc>,
    ) -> std::result::Result<f64, CostSourceError> {
        let fetch = source.month_to_date(start);
        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(CostSourceError::Timeout(self.config.fetch_timeout)),
        }
    }

    /// Current month-to-date status, from cache when fresh.
    ///
    /// The cache lock is held across the fetch, so concurrent callers that
    /// find the cache stale wait for one fetch instead of issuing their own.
    pub async fn get_status(&self) -> BudgetStatus {
        let now = self.clock.now();
        let month_key = month_key(now);
        let ttl = TimeDelta::from_std(self.config.cache_ttl).unwrap_or(TimeDelta::MAX);

        let mut cache = self.cache.lock().await;
        if let Some(ref entry) = *cache
            && entry.is_fresh(&month_key, now, ttl)
        {
            tracing::debug!(month = %month_key, spent_usd = entry.spent_usd, "budget cache hit");
            return self.status_from(entry);
        }

        let (spent_usd, hard_cap_active) = match self.source {
            None => (0.0, false),
            Some(ref source) => match self.fetch(source.as_ref(), month_start(now)).await {
                Ok(spent) => {
                    tracing::info!(month = %month_key, spent_usd = spent, "fetched month-to-date spend");
                    (spent, true)
                }
                Err(e) => {
                    tracing::warn!(
                        month = %month_key,
                        error = %e,
                        "cost source unavailable, budget hard cap disabled"
                    );
                    (0.0, false)
                }
            },
        };

        let entry = CachedSpend {
            month_key,
            spent_usd,
            fetched_at: self.clock.now(),
            hard_cap_active,
        };
        let status = self.status_from(&entry);
        *cache = Some(entry);
        status
    }

    /// Rejects with [`Error::BudgetExceeded`] when the hard cap is active and
    /// spend has reached the budget; otherwise returns the status.
    pub async fn enforce(&self) -> Result<BudgetStatus> {
        let status = self.get_status().await;
        if status.is_exceeded() {
            tracing::warn!(
                spent_usd = status.spent_usd,
                budget_usd = status.budget_usd,
                "monthly budget exceeded, rejecting request"
            );
            return Err(Error::BudgetExceeded {
                spent: status.spent_usd,
                limit: status.budget_usd,
            });
        }
        Ok(status)
    }

    /// Drops the cached status so the next call consults the cost source.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}
