//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;

use crate::game::Settings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// JSON-lines event stream to process
    pub events_path: PathBuf,
    /// Match report destination; round reports go next to it
    pub output_path: PathBuf,
    /// Trade window in seconds
    pub trade_interval_secs: f64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// `events_arg` (the first command-line argument) takes precedence over
    /// `EVENTS_PATH`.
    pub fn from_env(events_arg: Option<String>) -> Result<Self, ConfigError> {
        let events_path = events_arg
            .or_else(|| env::var("EVENTS_PATH").ok())
            .ok_or(ConfigError::Missing("EVENTS_PATH"))?;

        let trade_interval_secs = match env::var("TRADE_INTERVAL_SECS") {
            Ok(raw) => parse_interval(&raw)?,
            Err(_) => Settings::default().trade_interval_secs,
        };

        let log_json = match env::var("LOG_JSON") {
            Ok(raw) => parse_flag("LOG_JSON", &raw)?,
            Err(_) => false,
        };

        Ok(Self {
            events_path: PathBuf::from(events_path),
            output_path: env::var("OUTPUT_PATH")
                .unwrap_or_else(|_| "match_stats.json".to_string())
                .into(),
            trade_interval_secs,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json,
        })
    }

    pub fn settings(&self) -> Settings {
        Settings {
            trade_interval_secs: self.trade_interval_secs,
        }
    }
}

fn parse_interval(raw: &str) -> Result<f64, ConfigError> {
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(secs),
        _ => Err(ConfigError::Invalid {
            var: "TRADE_INTERVAL_SECS",
            value: raw.to_string(),
        }),
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}
