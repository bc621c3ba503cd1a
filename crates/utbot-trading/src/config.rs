//! Environment-driven configuration.

use std::env;
use std::time::Duration;

use thiserror::Error;

use utbot_core::Symbol;

use crate::http_client::DEFAULT_TIMEOUT;
use crate::session::DEFAULT_SESSION_TTL;

/// Default brokerage endpoint; the demo environment, never live.
pub const DEFAULT_BASE_URL: &str = "https://demo.tradovateapi.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {var} is required")]
    Missing { var: &'static str },

    #[error("environment variable {var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub base_url: String,
    pub webhook_secret: String,
    pub port: u16,
    pub symbol: Symbol,
    pub qty: u32,
    pub lookback: usize,
    pub key_value: f64,
    pub poll_interval: Duration,
    pub session_ttl: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Read configuration from the process environment. Credentials are
    /// required; everything else has a working default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let symbol_raw = env_or("UTBOT_SYMBOL", "MESZ5");
        let symbol = Symbol::parse(&symbol_raw).map_err(|error| ConfigError::Invalid {
            var: "UTBOT_SYMBOL",
            message: error.to_string(),
        })?;

        Ok(Self {
            username: require("TV_USERNAME")?,
            password: require("TV_PASSWORD")?,
            base_url: env_or("TV_BASE_URL", DEFAULT_BASE_URL),
            webhook_secret: require("WEBHOOK_SECRET")?,
            port: parse_or("PORT", 5000)?,
            symbol,
            qty: parse_or("UTBOT_QTY", 1)?,
            lookback: parse_or("UTBOT_LOOKBACK", 10)?,
            key_value: parse_or("UTBOT_KEY_VALUE", 1.0)?,
            poll_interval: Duration::from_secs(parse_or("UTBOT_POLL_INTERVAL_SECS", 60)?),
            session_ttl: Duration::from_secs(
                parse_or("UTBOT_SESSION_TTL_MINS", DEFAULT_SESSION_TTL.as_secs() / 60)? * 60,
            ),
            http_timeout: Duration::from_secs(parse_or(
                "UTBOT_HTTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT.as_secs(),
            )?),
        })
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { var }),
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_owned())
}

fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(value) => value.parse().map_err(|error: T::Err| ConfigError::Invalid {
            var,
            message: error.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state, so each one uses its own
    // variable names and restores nothing shared.

    #[test]
    fn parse_or_falls_back_to_the_default() {
        let value: u64 = parse_or("UTBOT_TEST_UNSET_VAR", 42).expect("default applies");
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        env::set_var("UTBOT_TEST_GARBAGE_VAR", "not-a-number");
        let result: Result<u64, _> = parse_or("UTBOT_TEST_GARBAGE_VAR", 42);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                var: "UTBOT_TEST_GARBAGE_VAR",
                ..
            })
        ));
        env::remove_var("UTBOT_TEST_GARBAGE_VAR");
    }

    #[test]
    fn empty_required_variable_counts_as_missing() {
        env::set_var("UTBOT_TEST_EMPTY_VAR", "");
        let result = require("UTBOT_TEST_EMPTY_VAR");
        assert!(matches!(
            result,
            Err(ConfigError::Missing {
                var: "UTBOT_TEST_EMPTY_VAR"
            })
        ));
        env::remove_var("UTBOT_TEST_EMPTY_VAR");
    }
}
