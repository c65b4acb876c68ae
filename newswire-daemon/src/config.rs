//! Environment-sourced daemon configuration

use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram API id from my.telegram.org
    pub api_id: i32,
    /// Telegram API hash
    pub api_hash: String,
    /// Path of the persisted session token
    pub session_path: PathBuf,
    /// SQLite database path
    pub db_path: PathBuf,
    /// Earliest day to backfill, inclusive
    pub start_date: NaiveDate,
    /// Channel usernames to ingest
    pub channels: Vec<String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {field}: {error}")]
    Invalid { field: &'static str, error: String },
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Expects:
    /// - TELEGRAM_API_ID / TELEGRAM_API_HASH: API credentials
    /// - START_DATE: earliest backfill day, `YYYY-MM-DD`
    /// - CHANNELS: comma-separated channel usernames
    /// - SESSION_PATH (default `session.bin`), DB_PATH (default
    ///   `data/newswire.db`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id = require("TELEGRAM_API_ID")?
            .parse::<i32>()
            .map_err(|e| invalid("TELEGRAM_API_ID", e))?;
        let api_hash = require("TELEGRAM_API_HASH")?;
        let session_path = env::var("SESSION_PATH")
            .unwrap_or_else(|_| "session.bin".to_string())
            .into();
        let db_path = env::var("DB_PATH")
            .unwrap_or_else(|_| "data/newswire.db".to_string())
            .into();
        let start_date = require("START_DATE")?
            .parse::<NaiveDate>()
            .map_err(|e| invalid("START_DATE", e))?;
        let channels = parse_channels(&require("CHANNELS")?)?;

        Ok(Self {
            api_id,
            api_hash,
            session_path,
            db_path,
            start_date,
            channels,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn invalid(field: &'static str, error: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        field,
        error: error.to_string(),
    }
}

fn parse_channels(raw: &str) -> Result<Vec<String>, ConfigError> {
    let channels: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if channels.is_empty() {
        return Err(ConfigError::Invalid {
            field: "CHANNELS",
            error: "no channels configured".to_string(),
        });
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channels() {
        assert_eq!(
            parse_channels("S2UndergroundWire, other_wire ,").unwrap(),
            vec!["S2UndergroundWire".to_string(), "other_wire".to_string()]
        );
        assert!(parse_channels("  , ").is_err());
    }

    #[test]
    fn test_start_date_format() {
        let date = "2023-01-15".parse::<NaiveDate>().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 1, 15).unwrap());
        assert!("15/01/2023".parse::<NaiveDate>().is_err());
    }
}
