//! Pure reshaping of raw API payloads into [`crate::types`].
//!
//! Every function here is total: missing fields become `None` and an absent
//! forecast block becomes an empty sequence.

use crate::api::{
    ApiCurrent, ApiDay, ApiForecast, ApiForecastDay, ApiHour, ApiLocation, CurrentResponse,
    ForecastResponse,
};
use crate::types::{
    Condition, CurrentConditions, CurrentWeather, DaySummary, ForecastDay, HourlyRecord, Location,
    Speed, Temperature, WeatherReport,
};

/// An absent or empty API id falls back to `"{name}-{country}"`.
pub fn format_location_data(location: &ApiLocation) -> Location {
    let id = location
        .id
        .as_ref()
        .map(ToString::to_string)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| {
            format!(
                "{}-{}",
                location.name.as_deref().unwrap_or_default(),
                location.country.as_deref().unwrap_or_default()
            )
        });

    Location {
        id,
        name: location.name.clone(),
        display_name: location.name.clone(),
        country: location.country.clone(),
        region: location.region.clone(),
        lat: location.lat,
        lon: location.lon,
        localtime: location.localtime.clone(),
        localtime_epoch: location.localtime_epoch,
        tz_id: location.tz_id.clone(),
    }
}

pub fn format_current_conditions(current: &ApiCurrent) -> CurrentConditions {
    CurrentConditions {
        temperature: Temperature::new(current.temp_c, current.temp_f),
        condition: current.condition.as_ref().map(Condition::from),
        humidity: current.humidity,
        wind: Speed {
            kph: current.wind_kph,
            mph: current.wind_mph,
        },
        feels_like: Temperature::new(current.feelslike_c, current.feelslike_f),
        uv: current.uv,
        last_updated: current.last_updated.clone(),
        air_quality: current.air_quality.clone(),
        is_day: current.is_day.map(|flag| flag != 0),
    }
}

pub fn format_current_weather(resp: &CurrentResponse) -> CurrentWeather {
    CurrentWeather {
        location: format_location_data(&resp.location),
        current: format_current_conditions(&resp.current),
    }
}

fn format_day_summary(day: &ApiDay) -> DaySummary {
    DaySummary {
        max_temp: Temperature::new(day.maxtemp_c, day.maxtemp_f),
        min_temp: Temperature::new(day.mintemp_c, day.mintemp_f),
        condition: day.condition.as_ref().map(Condition::from),
        avg_humidity: day.avghumidity,
        max_wind: Speed {
            kph: day.maxwind_kph,
            mph: day.maxwind_mph,
        },
        uv: day.uv,
    }
}

fn format_hour(hour: &ApiHour) -> HourlyRecord {
    HourlyRecord {
        time: hour.time.clone(),
        temperature: Temperature::new(hour.temp_c, hour.temp_f),
        condition: hour.condition.as_ref().map(Condition::from),
        humidity: hour.humidity,
        wind: Speed {
            kph: hour.wind_kph,
            mph: hour.wind_mph,
        },
        feels_like: Temperature::new(hour.feelslike_c, hour.feelslike_f),
    }
}

fn format_forecast_day(day: &ApiForecastDay) -> ForecastDay {
    ForecastDay {
        date: day.date.clone(),
        day: format_day_summary(&day.day),
        hours: day
            .hour
            .as_ref()
            .map(|hours| hours.iter().map(format_hour).collect()),
    }
}

/// Forecast days in API order; empty when the block or its list is absent.
pub fn format_forecast_days(forecast: Option<&ApiForecast>) -> Vec<ForecastDay> {
    forecast
        .and_then(|f| f.forecastday.as_ref())
        .map(|days| days.iter().map(format_forecast_day).collect())
        .unwrap_or_default()
}

/// The forecast selection of a forecast response. `None` when the API sent
/// no forecast block at all.
pub fn format_forecast(resp: &ForecastResponse) -> Option<Vec<ForecastDay>> {
    resp.forecast
        .as_ref()
        .map(|forecast| format_forecast_days(Some(forecast)))
}

pub fn format_weather_data(resp: Option<&ForecastResponse>) -> Option<WeatherReport> {
    let resp = resp?;
    Some(WeatherReport {
        location: format_location_data(&resp.location),
        current: format_current_conditions(&resp.current),
        forecast: format_forecast_days(resp.forecast.as_ref()),
    })
}
