//! Query cache for SkyCast weather data.
//!
//! [`QueryCache`] is a generic keyed cache with single-flight fetching,
//! freshness and retention windows, and prefix invalidation.
//! [`WeatherQueries`] binds it to the weather gateway.

pub mod cache;
pub mod key;
pub mod options;
pub mod retry;
pub mod weather;

pub use cache::{Cached, EntryPhase, QueryCache, QueryState};
pub use key::{weather_keys, KeyPart, QueryKey};
pub use options::{QueryOptions, WeatherQueryOptions};
pub use retry::{with_retry, RetryConfig, Retryable};
pub use weather::{QueryData, WeatherCache, WeatherQueries};
