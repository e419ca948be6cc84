//! Rate provider trait and implementations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use currencies_common::{from_unix_seconds, PIVOT_CURRENCY};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::error::{FxError, FxResult};
use crate::rate_table::RateTable;

/// Default OpenExchangeRates API root.
pub const OPEN_EXCHANGE_RATES_URL: &str = "https://openexchangerates.org/api/";

/// Source of USD-pivoted fiat rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch a fresh table of rates against USD. One round trip per call.
    async fn latest_usd_rates(&self) -> FxResult<RateTable>;
}

/// Configuration for [`OpenExchangeRatesProvider`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API root, ending in a slash.
    pub base_url: String,
    /// App ID sent in the `Authorization` header.
    pub app_id: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            base_url: OPEN_EXCHANGE_RATES_URL.to_string(),
            app_id: app_id.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn latest_url(&self) -> String {
        let separator = if self.base_url.ends_with('/') { "" } else { "/" };
        format!("{}{}latest.json?base={}", self.base_url, separator, PIVOT_CURRENCY)
    }
}

/// Body of `latest.json`.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    base: String,
    rates: HashMap<String, f64>,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Client for openexchangerates.org.
pub struct OpenExchangeRatesProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl OpenExchangeRatesProvider {
    pub fn new(config: ProviderConfig) -> FxResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FxError::ProviderUnavailable(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    fn name(&self) -> &str {
        "openexchangerates"
    }

    #[instrument(skip_all)]
    async fn latest_usd_rates(&self) -> FxResult<RateTable> {
        let url = self.config.latest_url();
        debug!(url = %url, "Fetching latest rates");

        let response = self
            .client
            .get(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.config.app_id),
            )
            .send()
            .await
            .map_err(|e| FxError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::ProviderStatus(status.as_u16()));
        }

        let body: LatestResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                FxError::ProviderUnavailable(e.to_string())
            } else {
                FxError::MalformedPayload(e.to_string())
            }
        })?;

        if body.base != PIVOT_CURRENCY {
            return Err(FxError::UnexpectedBase(body.base));
        }

        let mut table = RateTable::new(body.rates)
            .map_err(|e| FxError::MalformedPayload(e.to_string()))?;
        if table.is_empty() {
            return Err(FxError::MalformedPayload("no rates listed".to_string()));
        }

        if let Some(quoted_at) = body.timestamp.and_then(from_unix_seconds) {
            table = table.with_quoted_at(quoted_at);
        }

        let timestamp = table
            .quoted_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        info!(
            timestamp = %timestamp,
            base = %body.base,
            currencies = table.len(),
            "latest rates fetched"
        );

        Ok(table)
    }
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    rates: dashmap::DashMap<String, f64>,
    failure: parking_lot::RwLock<Option<String>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rates: dashmap::DashMap::new(),
            failure: parking_lot::RwLock::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set the USD rate for a currency.
    pub fn set_rate(&self, code: &str, rate: f64) {
        self.rates.insert(code.to_string(), rate);
    }

    /// Make every following fetch fail as unreachable, or succeed again with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.write() = message.map(str::to_string);
    }

    /// Number of fetches made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn latest_usd_rates(&self) -> FxResult<RateTable> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        if let Some(message) = self.failure.read().clone() {
            return Err(FxError::ProviderUnavailable(message));
        }

        let rates: Vec<(String, f64)> = self
            .rates
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect();
        RateTable::new(rates)
    }
}
