//! Weather API gateway for SkyCast
//!
//! Builds requests against a weatherapi.com-style v1 API, decodes the raw
//! payloads and reshapes them into the normalized types in [`types`].

pub mod api;
pub mod client;
pub mod error;
pub mod format;
pub mod transport;
pub mod types;

pub use api::{ApiLocation, CurrentResponse, ForecastResponse};
pub use client::{
    Endpoint, WeatherApiClient, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS, MIN_SEARCH_LEN,
};
pub use error::WeatherError;
pub use format::{
    format_current_conditions, format_current_weather, format_forecast, format_forecast_days,
    format_location_data, format_weather_data,
};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::*;
