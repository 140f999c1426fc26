//! Retry with exponential backoff for cache fetches.
//!
//! Only errors that report themselves as transient are retried (see
//! [`Retryable`]). Client errors and validation failures fail immediately.

use std::future::Future;
use std::time::Duration;

use skycast_weather::WeatherError;

/// Default retry configuration
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries (doubles each attempt)
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Default backoff with a different retry count.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Calculate the delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // initial_delay * 2^attempt
        let factor = 2u64.saturating_pow(attempt);
        let initial_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
    }
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for WeatherError {
    fn is_retryable(&self) -> bool {
        WeatherError::is_retryable(self)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent. The last error is returned.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("Request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                tracing::debug!("Non-retryable error: {}", e);
                return Err(e);
            }
            Err(e) if attempt >= config.max_retries => {
                if config.max_retries > 0 {
                    tracing::error!("All {} attempts exhausted: {}", attempt + 1, e);
                }
                return Err(e);
            }
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                attempt += 1;
                tracing::warn!(
                    "Retryable error, attempt {} of {} in {:?}: {}",
                    attempt + 1,
                    config.max_retries + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> WeatherError {
        WeatherError::Http {
            status: 503,
            status_text: "Service Unavailable".into(),
        }
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(RetryConfig::none().max_retries, 0);
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(64), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let config = RetryConfig::default();
        let result: Result<&str, WeatherError> = with_retry(&config, move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(server_error())
            } else {
                Ok("sunny")
            }
        })
        .await;

        assert_eq!(result, Ok("sunny"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let config = RetryConfig::new(2, 10, 100);
        let result: Result<(), WeatherError> = with_retry(&config, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(server_error())
        })
        .await;

        assert_eq!(result, Err(server_error()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let config = RetryConfig::default();
        let result: Result<(), WeatherError> = with_retry(&config, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(WeatherError::Http {
                status: 400,
                status_text: "Bad Request".into(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_config_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let config = RetryConfig::none();
        let result: Result<(), WeatherError> = with_retry(&config, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(WeatherError::Transport("connection reset".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
