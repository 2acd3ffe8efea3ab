use flagcall_core::EngineConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// JSON file backing the high-score store.
    pub score_path: PathBuf,
    pub log_level: Level,
    /// How long a session waits for the browser to finish speaking a
    /// command before starting the round timer on its own.
    pub speech_timeout: Duration,
    pub engine: EngineConfig,
}

/// Reads `var`, falling back to `default` when unset.
fn var_or<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn seconds_var(var: &str, default: f64, allow_zero: bool) -> Result<f64, ConfigError> {
    let value = var_or(var, default)?;
    let in_range = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
    if !in_range {
        return Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("'{value}' is not a usable number of seconds"),
        ));
    }
    Ok(value)
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let score_path = std::env::var("SCORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/highscore.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let speech_timeout = Duration::from_millis(var_or("SPEECH_TIMEOUT_MS", 3000u64)?);

        let defaults = EngineConfig::default();
        let base_time_limit = seconds_var("BASE_TIME_LIMIT", defaults.base_time_limit, false)?;
        let time_decrement = seconds_var("TIME_DECREMENT", defaults.time_decrement, true)?;
        let min_time_limit = seconds_var("MIN_TIME_LIMIT", defaults.min_time_limit, false)?;
        if min_time_limit > base_time_limit {
            return Err(ConfigError::InvalidValue(
                "MIN_TIME_LIMIT".to_string(),
                format!("{min_time_limit} exceeds BASE_TIME_LIMIT {base_time_limit}"),
            ));
        }

        Ok(Self {
            bind_address,
            score_path,
            log_level,
            speech_timeout,
            engine: EngineConfig {
                base_time_limit,
                time_decrement,
                min_time_limit,
                ..defaults
            },
        })
    }
}
