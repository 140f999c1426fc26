//! Weather gateway error types.

use skycast_core::config::MAX_FORECAST_DAYS;
use skycast_core::{AppError, ConfigError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

/// Errors raised by the weather API gateway.
///
/// `Clone` so a single failed fetch can be handed to every caller waiting
/// on the same cache entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    /// Rejected before any request was made.
    #[error("{0} is required")]
    InvalidArgument(&'static str),

    /// Rejected before any request was made.
    #[error("Forecast days must be between 1 and {}, got {0}", MAX_FORECAST_DAYS)]
    DaysOutOfRange(u32),

    /// The API answered with a non-2xx status.
    #[error("API call failed: {status} {status_text}")]
    Http { status: u16, status_text: String },

    /// The request never produced a response (DNS, connect, reset, timeout).
    #[error("Network error: {0}")]
    Transport(String),

    /// The configured base URL cannot be used to build request URLs.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// The response body was not the JSON we expected.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A cache entry holds a different kind of payload than its key implies.
    #[error("Cache entry {key} holds {found} data")]
    MismatchedEntry { key: String, found: &'static str },
}

impl WeatherError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::InvalidArgument(_)
            | Self::DaysOutOfRange(_)
            | Self::InvalidUrl(_)
            | Self::Parse(_)
            | Self::MismatchedEntry { .. } => false,
        }
    }

    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        AppError::from(self.clone()).user_message()
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.into_network_error().to_string())
    }
}

impl From<url::ParseError> for WeatherError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        let message = e.to_string();
        match e {
            WeatherError::InvalidArgument(_) | WeatherError::DaysOutOfRange(_) => {
                AppError::InvalidInput(message)
            }
            WeatherError::Http {
                status,
                status_text,
            } => AppError::Network(NetworkError::ServerError {
                status,
                message: status_text,
            }),
            WeatherError::InvalidUrl(msg) => AppError::Config(ConfigError::Invalid(msg)),
            WeatherError::Transport(msg) => AppError::Network(NetworkError::ConnectionFailed(msg)),
            WeatherError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
            WeatherError::MismatchedEntry { .. } => AppError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display_carries_status() {
        let err = WeatherError::Http {
            status: 500,
            status_text: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "API call failed: 500 Internal Server Error");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = WeatherError::InvalidArgument("Location");
        assert_eq!(err.to_string(), "Location is required");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_is_retryable() {
        assert!(WeatherError::Transport("reset".into()).is_retryable());
        assert!(WeatherError::Http { status: 503, status_text: String::new() }.is_retryable());
        assert!(WeatherError::Http { status: 429, status_text: String::new() }.is_retryable());
        assert!(!WeatherError::Http { status: 400, status_text: String::new() }.is_retryable());
        assert!(!WeatherError::Http { status: 401, status_text: String::new() }.is_retryable());
        assert!(!WeatherError::InvalidArgument("Location").is_retryable());
        assert!(!WeatherError::Parse("eof".into()).is_retryable());
        assert!(!WeatherError::InvalidUrl("relative URL without a base".into()).is_retryable());
        assert!(!WeatherError::DaysOutOfRange(0).is_retryable());
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = WeatherError::Http {
            status: 502,
            status_text: "Bad Gateway".into(),
        }
        .into();
        assert!(matches!(
            app,
            AppError::Network(NetworkError::ServerError { status: 502, .. })
        ));

        let app: AppError = WeatherError::InvalidArgument("Location").into();
        assert!(matches!(app, AppError::InvalidInput(_)));

        let app: AppError = WeatherError::DaysOutOfRange(20).into();
        assert!(matches!(app, AppError::InvalidInput(_)));
        assert_eq!(app.user_message(), "Please check your input and try again.");

        let app: AppError = WeatherError::MismatchedEntry {
            key: r#"["weather", "current", "Paris"]"#.into(),
            found: "locations",
        }
        .into();
        assert!(matches!(app, AppError::Internal(_)));
    }

    #[test]
    fn test_user_message() {
        let err = WeatherError::Http {
            status: 403,
            status_text: "Forbidden".into(),
        };
        assert!(err.user_message().contains("API key"));
    }
}
