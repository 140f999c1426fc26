//! Weather API gateway client.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use skycast_core::ApiConfig;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::api::{ApiLocation, CurrentResponse, ForecastResponse};
use crate::error::WeatherError;
use crate::transport::{HttpTransport, ReqwestTransport};

pub use skycast_core::config::{DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS};

/// Searches shorter than this (after trimming) never reach the network.
pub const MIN_SEARCH_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    Current,
    Forecast,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Search => "/search.json",
            Self::Current => "/current.json",
            Self::Forecast => "/forecast.json",
        }
    }
}

type Params = [(&'static str, Option<String>)];

pub struct WeatherApiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: String,
    search_limit: u32,
    default_days: u32,
}

impl WeatherApiClient {
    /// Client using the default `reqwest` transport.
    pub fn new(config: &ApiConfig) -> Result<Self, WeatherError> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: &ApiConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, WeatherError> {
        let parsed = Url::parse(&config.base_url)?;
        if parsed.cannot_be_a_base() {
            return Err(WeatherError::InvalidUrl(config.base_url.clone()));
        }

        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            search_limit: config.search_limit,
            default_days: config.default_days,
        })
    }

    /// Forecast length used when a caller passes no `days`.
    pub fn default_days(&self) -> u32 {
        self.default_days
    }

    /// `days`, or the configured default, checked against the range the
    /// forecast endpoint accepts.
    pub fn resolve_days(&self, days: Option<u32>) -> Result<u32, WeatherError> {
        require_days(days.unwrap_or(self.default_days))
    }

    /// Find locations matching `query`.
    ///
    /// Never fails: short queries return nothing without a request, and any
    /// request or decode failure is logged and reported as no results.
    #[instrument(skip(self), level = "info")]
    pub async fn search_locations(&self, query: &str) -> Vec<ApiLocation> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }

        let params = [
            ("q", Some(query.to_string())),
            ("limit", Some(self.search_limit.to_string())),
        ];

        let body: serde_json::Value = match self.make_api_call(Endpoint::Search, &params).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Location search failed");
                return Vec::new();
            }
        };

        let locations = parse_search_results(body);
        debug!(count = locations.len(), "Location search complete");
        locations
    }

    /// Current conditions (with air quality) for a location.
    #[instrument(skip(self), level = "info")]
    pub async fn get_current_weather(
        &self,
        location: &str,
    ) -> Result<CurrentResponse, WeatherError> {
        let location = require_location(location)?;

        let params = [("q", Some(location.to_string())), ("aqi", Some("yes".into()))];
        self.make_api_call(Endpoint::Current, &params).await
    }

    /// Current conditions plus a `days`-day forecast. Alerts are not requested.
    #[instrument(skip(self), level = "info")]
    pub async fn get_weather_forecast(
        &self,
        location: &str,
        days: u32,
    ) -> Result<ForecastResponse, WeatherError> {
        let location = require_location(location)?;
        let days = require_days(days)?;

        let params = [
            ("q", Some(location.to_string())),
            ("days", Some(days.to_string())),
            ("aqi", Some("yes".into())),
            ("alerts", Some("no".into())),
        ];
        self.make_api_call(Endpoint::Forecast, &params).await
    }

    /// Combined current and forecast data. Same request as
    /// [`get_weather_forecast`](Self::get_weather_forecast).
    pub async fn get_weather_data(
        &self,
        location: &str,
        days: u32,
    ) -> Result<ForecastResponse, WeatherError> {
        self.get_weather_forecast(location, days).await
    }

    /// Endpoint URL with `key` first, then every parameter that has a value.
    fn build_url(&self, endpoint: Endpoint, params: &Params) -> Result<Url, WeatherError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint.path()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            for (name, value) in params {
                if let Some(value) = value {
                    pairs.append_pair(name, value);
                }
            }
        }
        Ok(url)
    }

    async fn make_api_call<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        params: &Params,
    ) -> Result<T, WeatherError> {
        let url = self.build_url(endpoint, params)?;
        debug!(endpoint = endpoint.path(), "Calling weather API");

        let response = self.transport.get(url).await?;
        if !response.is_success() {
            return Err(WeatherError::Http {
                status: response.status,
                status_text: response.status_text,
            });
        }

        Ok(serde_json::from_str(&response.body)?)
    }
}

fn require_location(location: &str) -> Result<&str, WeatherError> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(WeatherError::InvalidArgument("Location"));
    }
    Ok(trimmed)
}

fn require_days(days: u32) -> Result<u32, WeatherError> {
    if days == 0 || days > MAX_FORECAST_DAYS {
        return Err(WeatherError::DaysOutOfRange(days));
    }
    Ok(days)
}

/// Accepts either a bare array or `{ "data": [...] }`.
fn parse_search_results(body: serde_json::Value) -> Vec<ApiLocation> {
    let items = match body {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut obj) => match obj.remove("data") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                warn!("Unexpected search results format: object without a data array");
                return Vec::new();
            }
        },
        other => {
            warn!(body = %other, "Unexpected search results format");
            return Vec::new();
        }
    };

    match items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<ApiLocation>, _>>()
    {
        Ok(locations) => locations,
        Err(e) => {
            warn!(error = %e, "Malformed search results");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FakeTransport {
        status: u16,
        status_text: &'static str,
        body: String,
        calls: Mutex<Vec<Url>>,
    }

    impl FakeTransport {
        fn ok(body: serde_json::Value) -> Arc<Self> {
            Self::respond(200, "OK", body.to_string())
        }

        fn respond(status: u16, status_text: &'static str, body: String) -> Arc<Self> {
            Arc::new(Self {
                status,
                status_text,
                body,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Url> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn get(&self, url: Url) -> Result<HttpResponse, WeatherError> {
            self.calls.lock().push(url);
            Ok(HttpResponse {
                status: self.status,
                status_text: self.status_text.to_string(),
                body: self.body.clone(),
            })
        }
    }

    fn config() -> ApiConfig {
        ApiConfig {
            base_url: "https://api.example.test/v1".into(),
            api_key: "secret".into(),
            ..Default::default()
        }
    }

    fn client(transport: Arc<FakeTransport>) -> WeatherApiClient {
        WeatherApiClient::with_transport(&config(), transport).unwrap()
    }

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[tokio::test]
    async fn test_short_search_makes_no_request() {
        let transport = FakeTransport::ok(serde_json::json!([]));
        let client = client(transport.clone());

        assert!(client.search_locations("").await.is_empty());
        assert!(client.search_locations("  a  ").await.is_empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_search_trims_and_limits() {
        let transport = FakeTransport::ok(serde_json::json!([
            {"id": 1, "name": "London", "country": "United Kingdom"},
            {"id": 2, "name": "London", "country": "Canada"}
        ]));
        let client = client(transport.clone());

        let results = client.search_locations("  lon ").await;
        assert_eq!(results.len(), 2);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path(), "/v1/search.json");
        assert_eq!(
            query_pairs(&calls[0]),
            vec![
                ("key".to_string(), "secret".to_string()),
                ("q".to_string(), "lon".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_search_accepts_data_envelope() {
        let transport = FakeTransport::ok(serde_json::json!({
            "data": [{"name": "Paris", "country": "France"}]
        }));
        let results = client(transport).search_locations("par").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name.as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn test_search_unexpected_shape_is_empty() {
        let transport = FakeTransport::ok(serde_json::json!({"results": []}));
        assert!(client(transport).search_locations("par").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_swallows_server_error() {
        let transport =
            FakeTransport::respond(500, "Internal Server Error", String::new());
        let client = client(transport.clone());

        assert!(client.search_locations("paris").await.is_empty());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_location_rejected_before_request() {
        let transport = FakeTransport::ok(serde_json::json!({}));
        let client = client(transport.clone());

        let err = client.get_current_weather("").await.unwrap_err();
        assert_eq!(err, WeatherError::InvalidArgument("Location"));
        assert_eq!(err.to_string(), "Location is required");

        let err = client.get_weather_forecast("   ", 3).await.unwrap_err();
        assert_eq!(err, WeatherError::InvalidArgument("Location"));

        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_days_out_of_range_rejected_before_request() {
        let transport = FakeTransport::ok(serde_json::json!({}));
        let client = client(transport.clone());

        let err = client.get_weather_forecast("Oslo", 0).await.unwrap_err();
        assert_eq!(err, WeatherError::DaysOutOfRange(0));
        let err = client.get_weather_data("Oslo", MAX_FORECAST_DAYS + 1).await.unwrap_err();
        assert_eq!(err, WeatherError::DaysOutOfRange(15));
        assert_eq!(err.to_string(), "Forecast days must be between 1 and 14, got 15");

        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_resolve_days_uses_configured_default() {
        let mut api = config();
        api.default_days = 7;
        let transport = FakeTransport::ok(serde_json::json!({}));
        let client = WeatherApiClient::with_transport(&api, transport).unwrap();

        assert_eq!(client.default_days(), 7);
        assert_eq!(client.resolve_days(None), Ok(7));
        assert_eq!(client.resolve_days(Some(3)), Ok(3));
        assert_eq!(client.resolve_days(Some(0)), Err(WeatherError::DaysOutOfRange(0)));
    }

    #[tokio::test]
    async fn test_current_weather_params() {
        let transport = FakeTransport::ok(serde_json::json!({
            "location": {"name": "Berlin", "country": "Germany"},
            "current": {"temp_c": 21.0}
        }));
        let client = client(transport.clone());

        let resp = client.get_current_weather("Berlin").await.unwrap();
        assert_eq!(resp.current.temp_c, Some(21.0));

        let calls = transport.calls();
        assert_eq!(calls[0].path(), "/v1/current.json");
        assert_eq!(calls[0].query(), Some("key=secret&q=Berlin&aqi=yes"));
    }

    #[tokio::test]
    async fn test_forecast_and_data_share_request_shape() {
        let transport = FakeTransport::ok(serde_json::json!({"forecast": {"forecastday": []}}));
        let client = client(transport.clone());

        client.get_weather_forecast("Oslo", 3).await.unwrap();
        client.get_weather_data("Oslo", 3).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[0].path(), "/v1/forecast.json");
        assert_eq!(
            calls[0].query(),
            Some("key=secret&q=Oslo&days=3&aqi=yes&alerts=no")
        );
    }

    #[tokio::test]
    async fn test_non_success_maps_to_http_error() {
        let transport = FakeTransport::respond(403, "Forbidden", "{}".into());
        let err = client(transport)
            .get_current_weather("Rome")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            WeatherError::Http {
                status: 403,
                status_text: "Forbidden".into()
            }
        );
        assert_eq!(err.to_string(), "API call failed: 403 Forbidden");
    }

    #[tokio::test]
    async fn test_bad_body_is_parse_error() {
        let transport = FakeTransport::respond(200, "OK", "<html>".into());
        let err = client(transport)
            .get_weather_forecast("Rome", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[test]
    fn test_build_url_skips_missing_params() {
        let client = client(FakeTransport::ok(serde_json::json!([])));
        let url = client
            .build_url(
                Endpoint::Forecast,
                &[("q", Some("São Paulo".into())), ("days", None)],
            )
            .unwrap();
        assert_eq!(
            query_pairs(&url),
            vec![
                ("key".to_string(), "secret".to_string()),
                ("q".to_string(), "São Paulo".to_string()),
            ]
        );
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let mut cfg = config();
        cfg.base_url = "https://api.example.test/v1/".into();
        let client =
            WeatherApiClient::with_transport(&cfg, FakeTransport::ok(serde_json::json!([])))
                .unwrap();
        let url = client.build_url(Endpoint::Current, &[]).unwrap();
        assert_eq!(url.path(), "/v1/current.json");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut cfg = config();
        cfg.base_url = "not a url".into();
        let result =
            WeatherApiClient::with_transport(&cfg, FakeTransport::ok(serde_json::json!([])));
        assert!(matches!(result, Err(WeatherError::InvalidUrl(_))));
    }
}
