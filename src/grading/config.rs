//! Grader configuration parsed from environment variables.

use std::time::Duration;

use super::types::GradingError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Countdown the task views give a student before auto-submitting.
pub const DEFAULT_TIME_BUDGET_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingConfig {
    pub base_url: String,
    pub timeouts: GradingTimeouts,
    /// Seconds before an attempt auto-submits; `0` disables the countdown.
    pub time_budget_secs: u64,
}

impl GradingConfig {
    /// Config with defaults for everything but the base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts: GradingTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
        }
    }

    /// Build typed grader config from environment variables.
    ///
    /// Optional:
    /// - `STEPCHECK_BASE_URL`: default `http://127.0.0.1:5000/api`
    /// - `STEPCHECK_REQUEST_TIMEOUT_SECS`: default 30
    /// - `STEPCHECK_CONNECT_TIMEOUT_SECS`: default 10
    /// - `STEPCHECK_TIME_BUDGET_SECS`: default 300, `0` disables
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an http(s) URL.
    pub fn from_env() -> Result<Self, GradingError> {
        let base_url = std::env::var("STEPCHECK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        validate_base_url(&base_url)?;

        let mut config = Self::new(&base_url);
        config.timeouts = GradingTimeouts {
            request_secs: env_parse_u64("STEPCHECK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("STEPCHECK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        config.time_budget_secs = env_parse_u64("STEPCHECK_TIME_BUDGET_SECS", DEFAULT_TIME_BUDGET_SECS);
        Ok(config)
    }

    /// Replace the base URL, e.g. from a command-line flag.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an http(s) URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, GradingError> {
        validate_base_url(base_url)?;
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Countdown length, or `None` when disabled.
    #[must_use]
    pub fn time_budget(&self) -> Option<Duration> {
        (self.time_budget_secs > 0).then(|| Duration::from_secs(self.time_budget_secs))
    }
}

pub(crate) fn validate_base_url(raw: &str) -> Result<(), GradingError> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Ok(())
    } else {
        Err(GradingError::ConfigParse(format!("base URL must start with http:// or https://, got '{raw}'")))
    }
}

/// Unset falls back to `default` quietly; a value that does not parse falls
/// back with a warning naming the variable.
fn env_parse_u64(key: &str, default: u64) -> u64 {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    raw.trim().parse::<u64>().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, default, "ignoring unparseable env value");
        default
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
