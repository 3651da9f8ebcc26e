//! Runtime configuration for the cache and the rates API

use chrono::Duration;

/// Default base URL of the market-data API
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

/// Namespace prefixed to every key the timed cache writes
pub const DEFAULT_CACHE_NAMESPACE: &str = "api_cache";

/// Configuration for cache validity and manual refresh throttling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a stored entry stays usable after it was fetched
    pub cache_duration: Duration,
    /// Minimum time between two manual refreshes of the same key
    pub manual_refresh_cooldown: Duration,
    /// Store key prefix, joined to logical keys with `:`
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_duration: Duration::seconds(3600),         // 60 minutes
            manual_refresh_cooldown: Duration::seconds(300), // 5 minutes
            namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn with_cache_duration(mut self, cache_duration: Duration) -> Self {
        self.cache_duration = cache_duration;
        self
    }

    pub fn with_manual_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.manual_refresh_cooldown = cooldown;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Location of the market-data API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Normalized base URL, always ending in `/api` with no trailing slash
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ApiConfig {
    /// Builds a config from a user-supplied URL
    ///
    /// Trailing slashes are dropped and `/api` is appended when missing, so
    /// `https://host/`, `https://host` and `https://host/api/` all resolve to
    /// `https://host/api`.
    pub fn new(url: &str) -> Self {
        let trimmed = url.trim().trim_end_matches('/');
        let base_url = if trimmed.ends_with("/api") {
            trimmed.to_string()
        } else {
            format!("{}/api", trimmed)
        };
        Self { base_url }
    }

    /// Full URL of an API endpoint, e.g. `endpoint("exchange-rates")`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
