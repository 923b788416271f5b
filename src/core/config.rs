//! Runtime configuration read from the environment (and `.env` via dotenvy).

use anyhow::Result;
use std::env;
use std::time::Duration;

/// Two weeks, the app's standard retry interval
pub const DEFAULT_REMINDER_SECONDS: u64 = 14 * 24 * 60 * 60;

const DEFAULT_POLL_SECONDS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: String,
    pub log_level: String,
    /// Outcome catalog override; the built-in catalog is used when unset
    pub catalog_path: Option<String>,
    pub reminder_poll_seconds: u64,
    pub default_reminder_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "noggin.db".to_string(),
            log_level: "info".to_string(),
            catalog_path: None,
            reminder_poll_seconds: DEFAULT_POLL_SECONDS,
            default_reminder_seconds: DEFAULT_REMINDER_SECONDS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let parse_seconds = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(value) => {
                    let seconds: u64 = value
                        .trim()
                        .parse()
                        .map_err(|e| anyhow::anyhow!("Invalid {}: {} ({})", key, value, e))?;
                    if seconds == 0 {
                        return Err(anyhow::anyhow!("{} must be greater than zero", key));
                    }
                    Ok(seconds)
                }
                None => Ok(default),
            }
        };

        Ok(Config {
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            catalog_path: lookup("NOGGIN_CATALOG_PATH").filter(|p| !p.trim().is_empty()),
            reminder_poll_seconds: parse_seconds(
                "REMINDER_POLL_SECONDS",
                defaults.reminder_poll_seconds,
            )?,
            default_reminder_seconds: parse_seconds(
                "DEFAULT_REMINDER_SECONDS",
                defaults.default_reminder_seconds,
            )?,
        })
    }

    pub fn reminder_poll_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_poll_seconds)
    }

    pub fn default_reminder_delay(&self) -> Duration {
        Duration::from_secs(self.default_reminder_seconds)
    }
}
