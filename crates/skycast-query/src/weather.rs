//! Cached weather queries.
//!
//! [`WeatherQueries`] pairs each gateway call with its cache key and
//! options, then reshapes the cached raw payload into the view the caller
//! asked for. The cache is passed in explicitly so callers decide its scope.

use std::sync::Arc;

use skycast_weather::{
    format_current_weather, format_forecast, format_location_data, format_weather_data,
    ApiLocation, CurrentResponse, CurrentWeather, ForecastDay, ForecastResponse, Location,
    WeatherApiClient, WeatherError, WeatherReport, MIN_SEARCH_LEN,
};
use tracing::{debug, instrument};

use crate::cache::QueryCache;
use crate::key::{weather_keys, QueryKey};
use crate::options::WeatherQueryOptions;

/// Raw payloads stored in the weather cache.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Locations(Vec<ApiLocation>),
    Current(CurrentResponse),
    Forecast(ForecastResponse),
}

impl QueryData {
    fn kind(&self) -> &'static str {
        match self {
            Self::Locations(_) => "locations",
            Self::Current(_) => "current",
            Self::Forecast(_) => "forecast",
        }
    }
}

pub type WeatherCache = QueryCache<QueryData, WeatherError>;

fn unexpected(key: &QueryKey, data: &QueryData) -> WeatherError {
    WeatherError::MismatchedEntry {
        key: key.to_string(),
        found: data.kind(),
    }
}

fn location_enabled(location: &str) -> bool {
    !location.trim().is_empty()
}

fn search_enabled(query: &str) -> bool {
    query.trim().chars().count() >= MIN_SEARCH_LEN
}

pub struct WeatherQueries {
    client: Arc<WeatherApiClient>,
    options: WeatherQueryOptions,
}

impl WeatherQueries {
    pub fn new(client: Arc<WeatherApiClient>, options: WeatherQueryOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &WeatherQueryOptions {
        &self.options
    }

    /// Forecast length used when a query is given no `days`.
    pub fn default_days(&self) -> u32 {
        self.client.default_days()
    }

    /// Locations matching `query`. Never cached and never retried; failures
    /// surface as an empty list.
    #[instrument(skip(self, cache), level = "debug")]
    pub async fn search_locations(&self, cache: &WeatherCache, query: &str) -> Vec<Location> {
        if !search_enabled(query) {
            return Vec::new();
        }

        let key = weather_keys::search(query);
        let client = self.client.clone();
        let q = query.trim().to_string();
        let result = cache
            .fetch(key.clone(), &self.options.search, move || {
                let client = client.clone();
                let q = q.clone();
                async move { Ok(QueryData::Locations(client.search_locations(&q).await)) }
            })
            .await;

        match result {
            Ok(QueryData::Locations(locations)) => {
                locations.iter().map(format_location_data).collect()
            }
            Ok(other) => {
                debug!(error = %unexpected(&key, &other), "Ignoring search entry");
                Vec::new()
            }
            Err(_) => Vec::new(),
        }
    }

    /// Location plus current conditions. `Ok(None)` when `location` is blank.
    #[instrument(skip(self, cache), level = "debug")]
    pub async fn current_weather(
        &self,
        cache: &WeatherCache,
        location: &str,
    ) -> Result<Option<CurrentWeather>, WeatherError> {
        if !location_enabled(location) {
            return Ok(None);
        }

        let key = weather_keys::current(location);
        let client = self.client.clone();
        let loc = location.to_string();
        let data = cache
            .fetch(key.clone(), &self.options.current, move || {
                let client = client.clone();
                let loc = loc.clone();
                async move { client.get_current_weather(&loc).await.map(QueryData::Current) }
            })
            .await?;

        match data {
            QueryData::Current(resp) => Ok(Some(format_current_weather(&resp))),
            other => Err(unexpected(&key, &other)),
        }
    }

    /// Forecast days. `Ok(None)` when `location` is blank or the API sent no
    /// forecast block. `days` of `None` uses the configured default, so both
    /// spellings share one entry.
    #[instrument(skip(self, cache), level = "debug")]
    pub async fn weather_forecast(
        &self,
        cache: &WeatherCache,
        location: &str,
        days: Option<u32>,
    ) -> Result<Option<Vec<ForecastDay>>, WeatherError> {
        if !location_enabled(location) {
            return Ok(None);
        }
        let days = self.client.resolve_days(days)?;

        let key = weather_keys::forecast(location, days);
        let client = self.client.clone();
        let loc = location.to_string();
        let data = cache
            .fetch(key.clone(), &self.options.forecast, move || {
                let client = client.clone();
                let loc = loc.clone();
                async move {
                    client
                        .get_weather_forecast(&loc, days)
                        .await
                        .map(QueryData::Forecast)
                }
            })
            .await?;

        match data {
            QueryData::Forecast(resp) => Ok(format_forecast(&resp)),
            other => Err(unexpected(&key, &other)),
        }
    }

    /// Combined current conditions and forecast.
    #[instrument(skip(self, cache), level = "debug")]
    pub async fn weather_data(
        &self,
        cache: &WeatherCache,
        location: &str,
        days: Option<u32>,
    ) -> Result<Option<WeatherReport>, WeatherError> {
        if !location_enabled(location) {
            return Ok(None);
        }
        let days = self.client.resolve_days(days)?;

        let key = weather_keys::data(location, days);
        let data = cache
            .fetch(key.clone(), &self.options.data, self.data_fetcher(location, days))
            .await?;

        match data {
            QueryData::Forecast(resp) => Ok(format_weather_data(Some(&resp))),
            other => Err(unexpected(&key, &other)),
        }
    }

    /// Fetch combined data for `location` ignoring freshness, then write its
    /// current conditions into the current-weather entry so both entries
    /// agree.
    #[instrument(skip(self, cache), level = "info")]
    pub async fn refresh_weather(
        &self,
        cache: &WeatherCache,
        location: &str,
        days: Option<u32>,
    ) -> Result<WeatherReport, WeatherError> {
        if !location_enabled(location) {
            return Err(WeatherError::InvalidArgument("Location"));
        }
        let days = self.client.resolve_days(days)?;

        let key = weather_keys::data(location, days);
        let data = cache
            .refetch(key.clone(), &self.options.data, self.data_fetcher(location, days))
            .await?;

        let resp = match data {
            QueryData::Forecast(resp) => resp,
            other => return Err(unexpected(&key, &other)),
        };

        cache.set_query_data(
            weather_keys::current(location),
            QueryData::Current(CurrentResponse::from(&resp)),
            &self.options.current,
        );

        Ok(format_weather_data(Some(&resp)).unwrap_or_default())
    }

    /// Mark the current, forecast and combined entries for `location` stale.
    /// Returns the number of entries marked.
    pub fn invalidate_location(&self, cache: &WeatherCache, location: &str) -> usize {
        weather_keys::location_scopes(location)
            .iter()
            .map(|prefix| cache.invalidate_queries(prefix))
            .sum()
    }

    pub fn invalidate_all_weather(&self, cache: &WeatherCache) -> usize {
        cache.invalidate_queries(&weather_keys::all())
    }

    fn data_fetcher(
        &self,
        location: &str,
        days: u32,
    ) -> impl FnMut() -> futures::future::BoxFuture<'static, Result<QueryData, WeatherError>>
           + Send
           + 'static {
        use futures::FutureExt;

        let client = self.client.clone();
        let loc = location.to_string();
        move || {
            let client = client.clone();
            let loc = loc.clone();
            async move { client.get_weather_data(&loc, days).await.map(QueryData::Forecast) }
                .boxed()
        }
    }
}
