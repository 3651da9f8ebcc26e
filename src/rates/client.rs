//! Exchange-rate API client
//!
//! Fetches the pair table from the market-data API's `exchange-rates`
//! endpoint and keeps it in the timed cache.

use reqwest::Client;
use thiserror::Error;

use super::RateTable;
use crate::cache::{Clock, Store, SystemClock, TimedCache};
use crate::config::ApiConfig;

/// Logical cache key for the rate table
pub const RATES_CACHE_KEY: &str = "exchange_rates";

/// Endpoint path, relative to the API base URL
const EXCHANGE_RATES_PATH: &str = "exchange-rates";

/// Errors that can occur when fetching exchange rates
#[derive(Debug, Error)]
pub enum RatesError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Exchange rate API returned status {0}")]
    Status(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Client for the exchange-rate table, backed by a timed cache
#[derive(Debug)]
pub struct RatesClient<S, C = SystemClock> {
    http_client: Client,
    api: ApiConfig,
    cache: TimedCache<S, C>,
}

impl<S: Store, C: Clock> RatesClient<S, C> {
    pub fn new(api: ApiConfig, cache: TimedCache<S, C>) -> Self {
        Self::with_client(Client::new(), api, cache)
    }

    /// Create a new RatesClient with a custom HTTP client
    pub fn with_client(http_client: Client, api: ApiConfig, cache: TimedCache<S, C>) -> Self {
        Self {
            http_client,
            api,
            cache,
        }
    }

    pub fn cache(&self) -> &TimedCache<S, C> {
        &self.cache
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// Returns the rate table, from cache when it is still valid
    ///
    /// `force_refresh` skips the cache and records a manual refresh. Callers
    /// are expected to check [`TimedCache::can_manual_refresh_key`] first.
    pub async fn fetch_rates(&self, force_refresh: bool) -> Result<RateTable, RatesError> {
        self.cache
            .fetch_with_cache(RATES_CACHE_KEY, || self.fetch_from_api(), force_refresh)
            .await
    }

    /// Fetches the rate table straight from the API
    async fn fetch_from_api(&self) -> Result<RateTable, RatesError> {
        let url = self.api.endpoint(EXCHANGE_RATES_PATH);

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RatesError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let table: RateTable = serde_json::from_str(&text)?;
        Ok(table)
    }
}
