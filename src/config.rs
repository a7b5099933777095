use std::collections::HashMap;
use thiserror::Error;

/// Offset used when no `TRADE_DAY_OFFSET_MINUTES` is configured.
/// UTC+05:30, the exchange timezone the bucketing day boundary follows.
const DEFAULT_TRADE_DAY_OFFSET_MINUTES: i32 = 330;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    /// Fixed UTC offset, in minutes, at which execution timestamps are
    /// truncated to a calendar trade day for bucketing.
    pub trade_day_offset_minutes: i32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let trade_day_offset_minutes = match env_map.get("TRADE_DAY_OFFSET_MINUTES") {
            Some(raw) => raw.parse::<i32>().map_err(|_| {
                ConfigError::InvalidValue(
                    "TRADE_DAY_OFFSET_MINUTES".to_string(),
                    "must be a whole number of minutes".to_string(),
                )
            })?,
            None => DEFAULT_TRADE_DAY_OFFSET_MINUTES,
        };

        // FixedOffset rejects offsets of a day or more; fail here rather
        // than at first submission.
        if trade_day_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue(
                "TRADE_DAY_OFFSET_MINUTES".to_string(),
                "must be within +/- 24 hours".to_string(),
            ));
        }

        Ok(Config {
            database_path,
            trade_day_offset_minutes,
        })
    }
}
