//! Application Configuration Module
//!
//! Loads the coach's settings from environment variables (and a `.env` file,
//! if present) into a single struct built once at startup and handed to the
//! session engine.

use mindlink_core::bloom::BloomLevel;
use mindlink_core::config::EngineConfig;
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub elevenlabs_api_key: Option<SecretString>,
    pub export_dir: PathBuf,
    pub log_level: Level,
    pub engine: EngineConfig,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `MINDLINK_BACKEND_URL`: Base address of the patient backend. Defaults to `http://localhost:5001`.
    /// *   `NERVOUS_THRESHOLD` / `CALMING_THRESHOLD`: Mood thresholds. Default `-0.3` / `0.1`.
    /// *   `BLOOM_THRESHOLDS`: Comma-separated question-quality bars per level transition. Default `60,75,90`.
    /// *   `BLOOM_START_LEVEL`: Starting difficulty. Defaults to `apply`.
    /// *   `RECAP_INTERVAL`: Therapist turns between recaps. Defaults to `5`.
    /// *   `REQUEST_TIMEOUT_SECS`: Backend request timeout. Defaults to `10`.
    /// *   `ELEVENLABS_API_KEY`: (Optional) Enables spoken patient replies.
    /// *   `EXPORT_DIR`: Where session exports are written. Defaults to the working directory.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let backend_url =
            lookup("MINDLINK_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "MINDLINK_BACKEND_URL".to_string(),
                format!("'{backend_url}' is not an http(s) address"),
            ));
        }

        let nervous_threshold =
            parse_threshold(&lookup, "NERVOUS_THRESHOLD", defaults.nervous_threshold)?;
        let calming_threshold =
            parse_threshold(&lookup, "CALMING_THRESHOLD", defaults.calming_threshold)?;
        let recap_interval = parse_or(&lookup, "RECAP_INTERVAL", defaults.recap_interval)?;
        let start_level = parse_or(&lookup, "BLOOM_START_LEVEL", defaults.start_level)?;
        let timeout_secs = parse_or(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let bloom_thresholds = match lookup("BLOOM_THRESHOLDS") {
            Some(raw) => parse_thresholds(&raw)?,
            None => defaults.bloom_thresholds.clone(),
        };

        let elevenlabs_api_key = lookup("ELEVENLABS_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        let export_dir = lookup("EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            backend_url,
            request_timeout: Duration::from_secs(timeout_secs),
            elevenlabs_api_key,
            export_dir,
            log_level,
            engine: EngineConfig {
                nervous_threshold,
                calming_threshold,
                bloom_thresholds,
                start_level,
                recap_interval,
                ..defaults
            }
            .validated(),
        })
    }

    pub fn with_start_level(mut self, level: BloomLevel) -> Self {
        self.engine.start_level = level;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Like `parse_or`, but `NaN` and infinities are refused: they compare false
/// against everything and would slip past threshold validation.
fn parse_threshold<F>(lookup: &F, key: &str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if !value.is_finite() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("{value} is not a finite number"),
        ));
    }
    Ok(value)
}

fn parse_thresholds(raw: &str) -> Result<Vec<f64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let value = part.parse::<f64>().map_err(|e| {
                ConfigError::InvalidValue("BLOOM_THRESHOLDS".to_string(), format!("{part}: {e}"))
            })?;
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue(
                    "BLOOM_THRESHOLDS".to_string(),
                    format!("{part} is not a finite number"),
                ));
            }
            Ok(value)
        })
        .collect()
}
