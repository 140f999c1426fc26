//! Normalized weather shapes handed to callers.
//!
//! These are built by [`crate::format`] from the raw API payloads. Values the
//! API may omit stay `Option` rather than being invented.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{ApiAirQuality, ApiCondition};

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

/// A temperature reported in both units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub celsius: Option<f64>,
    pub fahrenheit: Option<f64>,
}

impl Temperature {
    pub fn new(celsius: Option<f64>, fahrenheit: Option<f64>) -> Self {
        Self {
            celsius,
            fahrenheit,
        }
    }

    pub fn in_unit(&self, unit: TemperatureUnit) -> Option<f64> {
        match unit {
            TemperatureUnit::Celsius => self.celsius,
            TemperatureUnit::Fahrenheit => self.fahrenheit,
        }
    }
}

/// A wind speed reported in both units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub kph: Option<f64>,
    pub mph: Option<f64>,
}

/// Condition descriptor: text, icon URL and numeric code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: Option<String>,
    pub icon: Option<String>,
    pub code: Option<u32>,
}

impl From<&ApiCondition> for Condition {
    fn from(c: &ApiCondition) -> Self {
        Self {
            text: c.text.clone(),
            icon: c.icon.clone(),
            code: c.code,
        }
    }
}

/// Air quality readings. Passed through unchanged from the API.
pub type AirQuality = ApiAirQuality;

/// Geographic location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// API id, or `"{name}-{country}"` when the API sent none.
    pub id: String,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub localtime: Option<String>,
    pub localtime_epoch: Option<i64>,
    pub tz_id: Option<String>,
}

/// Current weather conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: Temperature,
    pub condition: Option<Condition>,
    pub humidity: Option<f64>,
    pub wind: Speed,
    pub feels_like: Temperature,
    pub uv: Option<f64>,
    pub last_updated: Option<String>,
    pub air_quality: Option<AirQuality>,
    pub is_day: Option<bool>,
}

/// Daily summary inside a forecast day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub max_temp: Temperature,
    pub min_temp: Temperature,
    pub condition: Option<Condition>,
    pub avg_humidity: Option<f64>,
    pub max_wind: Speed,
    pub uv: Option<f64>,
}

/// Hourly forecast entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    pub time: Option<String>,
    pub temperature: Temperature,
    pub condition: Option<Condition>,
    pub humidity: Option<f64>,
    pub wind: Speed,
    pub feels_like: Temperature,
}

/// Daily forecast entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Calendar date as sent by the API (`YYYY-MM-DD`).
    pub date: Option<String>,
    pub day: DaySummary,
    /// Hourly records in API order. `None` when the API omitted them.
    pub hours: Option<Vec<HourlyRecord>>,
}

impl ForecastDay {
    /// Parsed calendar date, if the API sent a well-formed one.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

/// Location plus current conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub location: Location,
    pub current: CurrentConditions,
}

/// Combined current conditions and forecast for one location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: Location,
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastDay>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_in_unit() {
        let t = Temperature::new(Some(21.5), Some(70.7));
        assert_eq!(t.in_unit(TemperatureUnit::Celsius), Some(21.5));
        assert_eq!(t.in_unit(TemperatureUnit::Fahrenheit), Some(70.7));
        assert_eq!(TemperatureUnit::default(), TemperatureUnit::Celsius);
        assert_eq!(TemperatureUnit::Fahrenheit.symbol(), "°F");
    }

    #[test]
    fn test_calendar_date() {
        let day = ForecastDay {
            date: Some("2025-07-26".into()),
            ..Default::default()
        };
        assert_eq!(day.calendar_date(), NaiveDate::from_ymd_opt(2025, 7, 26));

        let bad = ForecastDay {
            date: Some("tomorrow".into()),
            ..Default::default()
        };
        assert_eq!(bad.calendar_date(), None);
        assert_eq!(ForecastDay::default().calendar_date(), None);
    }

    #[test]
    fn test_unit_serializes_lowercase() {
        let json = serde_json::to_string(&TemperatureUnit::Fahrenheit).unwrap_or_default();
        assert_eq!(json, "\"fahrenheit\"");
    }
}
