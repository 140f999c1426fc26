use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{AppError, ConfigError};

/// Environment variable that overrides `api.api_key`.
pub const API_KEY_ENV: &str = "SKYCAST_API_KEY";

/// Forecast length used when neither the caller nor the config file says.
pub const DEFAULT_FORECAST_DAYS: u32 = 5;

/// Upper bound accepted by the forecast endpoint.
pub const MAX_FORECAST_DAYS: u32 = 14;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(skip, default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Query cache freshness and retention windows
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weather API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Server-issued API key, sent as the `key` query parameter
    #[serde(default)]
    pub api_key: String,

    /// Maximum number of results requested from the search endpoint
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Days of forecast requested when the caller does not say
    #[serde(default = "default_days")]
    pub default_days: u32,

    /// Optional per-request timeout. No timeout is applied when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_search_limit() -> u32 {
    10
}

fn default_days() -> u32 {
    DEFAULT_FORECAST_DAYS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            search_limit: default_search_limit(),
            default_days: default_days(),
            timeout_secs: None,
        }
    }
}

impl ApiConfig {
    /// Request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Freshness (`stale`) and retention (`gc`) windows in minutes for each
/// weather query kind. Search is never cached and has no settings here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_current_stale")]
    pub current_stale_minutes: u64,
    #[serde(default = "default_current_gc")]
    pub current_gc_minutes: u64,
    #[serde(default = "default_forecast_stale")]
    pub forecast_stale_minutes: u64,
    #[serde(default = "default_forecast_gc")]
    pub forecast_gc_minutes: u64,
    #[serde(default = "default_current_stale")]
    pub data_stale_minutes: u64,
    #[serde(default = "default_current_gc")]
    pub data_gc_minutes: u64,
    /// Retries for current/forecast/data fetches (search never retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_current_stale() -> u64 {
    10
}

fn default_current_gc() -> u64 {
    30
}

fn default_forecast_stale() -> u64 {
    30
}

fn default_forecast_gc() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            current_stale_minutes: default_current_stale(),
            current_gc_minutes: default_current_gc(),
            forecast_stale_minutes: default_forecast_stale(),
            forecast_gc_minutes: default_forecast_gc(),
            data_stale_minutes: default_current_stale(),
            data_gc_minutes: default_current_gc(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, e.g. `info` or `skycast_query=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist.
    ///
    /// The API key from the environment wins over the file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(AppError::Io)
                .context("Failed to read config file")?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError(e.to_string()))
                .context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        if let Some(parent) = path.parent() {
            config.config_dir = parent.to_path_buf();
        }

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                tracing::debug!("Using API key from {}", API_KEY_ENV);
                config.api.api_key = key;
            }
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.api_key.trim().is_empty() {
            result.add_warning(
                "api.api_key",
                format!("Weather API key not set; add it to the config or {}", API_KEY_ENV),
            );
        }

        if self.api.search_limit == 0 {
            result.add_error("api.search_limit", "Search limit must be greater than 0");
        }

        if self.api.default_days == 0 || self.api.default_days > MAX_FORECAST_DAYS {
            result.add_error(
                "api.default_days",
                format!("Forecast days must be between 1 and {}", MAX_FORECAST_DAYS),
            );
        }

        if self.api.timeout_secs == Some(0) {
            result.add_error("api.timeout_secs", "Timeout must be greater than 0");
        }

        let windows = [
            (
                "cache.current",
                self.cache.current_stale_minutes,
                self.cache.current_gc_minutes,
            ),
            (
                "cache.forecast",
                self.cache.forecast_stale_minutes,
                self.cache.forecast_gc_minutes,
            ),
            (
                "cache.data",
                self.cache.data_stale_minutes,
                self.cache.data_gc_minutes,
            ),
        ];
        for (field, stale, gc) in windows {
            if stale > gc {
                result.add_warning(
                    field,
                    format!(
                        "Entries go stale after {} min but are evicted after {} min",
                        stale, gc
                    ),
                );
            }
        }

        if self.cache.max_retries > 10 {
            result.add_warning("cache.max_retries", "More than 10 retries configured");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(AppError::Io)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .map_err(AppError::Io)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".into()))?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
