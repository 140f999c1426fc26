//! Per-query freshness, retention and retry settings.

use std::time::Duration;

use skycast_core::CacheConfig;

use crate::retry::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long data counts as fresh after a write. Fresh data is served
    /// without a fetch.
    pub stale_time: Duration,
    /// How long an entry is kept after its last write before eviction.
    /// Zero drops the entry as soon as its fetch settles.
    pub gc_time: Duration,
    pub retry: RetryConfig,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            gc_time: Duration::from_secs(5 * 60),
            retry: RetryConfig::default(),
        }
    }
}

impl QueryOptions {
    pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            stale_time,
            gc_time,
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}

/// Options for each kind of weather query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQueryOptions {
    pub search: QueryOptions,
    pub current: QueryOptions,
    pub forecast: QueryOptions,
    pub data: QueryOptions,
}

impl Default for WeatherQueryOptions {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl WeatherQueryOptions {
    pub fn from_config(config: &CacheConfig) -> Self {
        let retry = RetryConfig::with_max_retries(config.max_retries);

        Self {
            search: QueryOptions::new(Duration::ZERO, Duration::ZERO)
                .with_retry(RetryConfig::none()),
            current: QueryOptions::new(
                minutes(config.current_stale_minutes),
                minutes(config.current_gc_minutes),
            )
            .with_retry(retry.clone()),
            forecast: QueryOptions::new(
                minutes(config.forecast_stale_minutes),
                minutes(config.forecast_gc_minutes),
            )
            .with_retry(retry.clone()),
            data: QueryOptions::new(
                minutes(config.data_stale_minutes),
                minutes(config.data_gc_minutes),
            )
            .with_retry(retry),
        }
    }
}
