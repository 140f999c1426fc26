//! Raw response shapes returned by the weather API.
//!
//! Every field is optional and every struct defaults, so a partial or
//! surprising payload still deserializes and the formatters in
//! [`crate::format`] stay total.

use serde::{Deserialize, Serialize};

/// Location identifier as sent by the API (numeric for search results).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ApiId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiLocation {
    pub id: Option<ApiId>,
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tz_id: Option<String>,
    pub localtime_epoch: Option<i64>,
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiCondition {
    pub text: Option<String>,
    pub icon: Option<String>,
    pub code: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiAirQuality {
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    #[serde(rename = "us-epa-index")]
    pub us_epa_index: Option<u8>,
    #[serde(rename = "gb-defra-index")]
    pub gb_defra_index: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiCurrent {
    pub last_updated_epoch: Option<i64>,
    pub last_updated: Option<String>,
    pub temp_c: Option<f64>,
    pub temp_f: Option<f64>,
    pub is_day: Option<u8>,
    pub condition: Option<ApiCondition>,
    pub wind_mph: Option<f64>,
    pub wind_kph: Option<f64>,
    pub humidity: Option<f64>,
    pub feelslike_c: Option<f64>,
    pub feelslike_f: Option<f64>,
    pub uv: Option<f64>,
    pub air_quality: Option<ApiAirQuality>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiDay {
    pub maxtemp_c: Option<f64>,
    pub maxtemp_f: Option<f64>,
    pub mintemp_c: Option<f64>,
    pub mintemp_f: Option<f64>,
    pub maxwind_mph: Option<f64>,
    pub maxwind_kph: Option<f64>,
    pub avghumidity: Option<f64>,
    pub uv: Option<f64>,
    pub condition: Option<ApiCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiHour {
    pub time_epoch: Option<i64>,
    pub time: Option<String>,
    pub temp_c: Option<f64>,
    pub temp_f: Option<f64>,
    pub condition: Option<ApiCondition>,
    pub humidity: Option<f64>,
    pub wind_mph: Option<f64>,
    pub wind_kph: Option<f64>,
    pub feelslike_c: Option<f64>,
    pub feelslike_f: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiForecastDay {
    pub date: Option<String>,
    pub day: ApiDay,
    pub hour: Option<Vec<ApiHour>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiForecast {
    pub forecastday: Option<Vec<ApiForecastDay>>,
}

/// Body of `/current.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentResponse {
    pub location: ApiLocation,
    pub current: ApiCurrent,
}

/// Body of `/forecast.json`: current conditions plus the forecast block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastResponse {
    pub location: ApiLocation,
    pub current: ApiCurrent,
    pub forecast: Option<ApiForecast>,
}

impl From<&ForecastResponse> for CurrentResponse {
    fn from(resp: &ForecastResponse) -> Self {
        Self {
            location: resp.location.clone(),
            current: resp.current.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_search_result_with_numeric_id() {
        let loc: ApiLocation = serde_json::from_value(serde_json::json!({
            "id": 2801268,
            "name": "London",
            "region": "City of London, Greater London",
            "country": "United Kingdom",
            "lat": 51.52,
            "lon": -0.11,
            "url": "london-city-of-london-greater-london-united-kingdom"
        }))
        .unwrap();

        assert_eq!(loc.id, Some(ApiId::Number(2801268)));
        assert_eq!(loc.id.unwrap().to_string(), "2801268");
        assert_eq!(loc.name.as_deref(), Some("London"));
        assert!(loc.tz_id.is_none());
    }

    #[test]
    fn test_air_quality_index_renames() {
        let aq: ApiAirQuality = serde_json::from_value(serde_json::json!({
            "pm2_5": 7.4,
            "us-epa-index": 1,
            "gb-defra-index": 2
        }))
        .unwrap();

        assert_eq!(aq.pm2_5, Some(7.4));
        assert_eq!(aq.us_epa_index, Some(1));
        assert_eq!(aq.gb_defra_index, Some(2));
    }

    #[test]
    fn test_empty_object_deserializes() {
        let resp: ForecastResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp, ForecastResponse::default());
        assert!(resp.forecast.is_none());
    }

    #[test]
    fn test_current_from_forecast_keeps_location_and_current() {
        let forecast = ForecastResponse {
            location: ApiLocation {
                name: Some("Paris".into()),
                ..Default::default()
            },
            current: ApiCurrent {
                temp_c: Some(18.0),
                ..Default::default()
            },
            forecast: Some(ApiForecast::default()),
        };

        let current = CurrentResponse::from(&forecast);
        assert_eq!(current.location.name.as_deref(), Some("Paris"));
        assert_eq!(current.current.temp_c, Some(18.0));
    }
}
