// crates/cf-acceptance-harness/src/config/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed harness defaults.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid or empty values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::eventually::PollWindow;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suite-wide default assertion timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed interval between snapshot samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Environment keys for harness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Default assertion timeout in seconds (positive integer).
    TimeoutSeconds,
    /// Poll interval in milliseconds (positive integer).
    PollIntervalMillis,
    /// Event log target: `stderr` or a file path.
    EventLog,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TimeoutSeconds => "CF_ACCEPTANCE_TIMEOUT_SEC",
            Self::PollIntervalMillis => "CF_ACCEPTANCE_POLL_INTERVAL_MS",
            Self::EventLog => "CF_ACCEPTANCE_EVENT_LOG",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Each variant names the offending environment variable or setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The variable is not valid UTF-8.
    #[error("{0} must be valid UTF-8")]
    InvalidUtf8(String),
    /// The variable is set but blank.
    #[error("{0} must not be empty")]
    Empty(String),
    /// The value failed validation.
    #[error("{name} {reason}")]
    Invalid {
        /// Variable or setting name.
        name: String,
        /// Validation failure.
        reason: String,
    },
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Where harness events are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLogTarget {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File(PathBuf),
}

/// Harness defaults threaded into every assertion.
///
/// # Invariants
/// - `poll_interval` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Default assertion timeout.
    default_timeout: Duration,
    /// Fixed interval between samples.
    poll_interval: Duration,
    /// Optional event log target.
    event_log: Option<EventLogTarget>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_log: None,
        }
    }
}

impl HarnessConfig {
    /// Builds a config with explicit timeout and poll interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `poll_interval` is zero.
    pub fn new(default_timeout: Duration, poll_interval: Duration) -> Result<Self, ConfigError> {
        if poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "poll_interval".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            default_timeout,
            poll_interval,
            event_log: None,
        })
    }

    /// Loads configuration from environment variables over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())? {
            config.default_timeout =
                Duration::from_secs(parse_positive(HarnessEnv::TimeoutSeconds.as_str(), &raw)?);
        }
        if let Some(raw) = read_env_nonempty(HarnessEnv::PollIntervalMillis.as_str())? {
            config.poll_interval = Duration::from_millis(parse_positive(
                HarnessEnv::PollIntervalMillis.as_str(),
                &raw,
            )?);
        }
        config.event_log = read_env_nonempty(HarnessEnv::EventLog.as_str())?.map(|raw| {
            if raw.trim().eq_ignore_ascii_case("stderr") {
                EventLogTarget::Stderr
            } else {
                EventLogTarget::File(PathBuf::from(raw))
            }
        });
        Ok(config)
    }

    /// Returns the default assertion timeout.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the event log target, if any.
    #[must_use]
    pub const fn event_log(&self) -> Option<&EventLogTarget> {
        self.event_log.as_ref()
    }

    /// Returns a copy with a different default timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns a copy whose default timeout is at least `minimum`.
    ///
    /// Lets a slower environment raise timeouts without shortening any that
    /// were configured longer.
    #[must_use]
    pub fn with_minimum_timeout(mut self, minimum: Duration) -> Self {
        self.default_timeout = self.default_timeout.max(minimum);
        self
    }

    /// Returns a copy with an event log target.
    #[must_use]
    pub fn with_event_log(mut self, target: EventLogTarget) -> Self {
        self.event_log = Some(target);
        self
    }

    /// Returns the default polling window.
    #[must_use]
    pub const fn window(&self) -> PollWindow {
        PollWindow::from_parts(self.default_timeout, self.poll_interval)
    }

    /// Returns a polling window with an overridden timeout.
    #[must_use]
    pub const fn window_with(&self, timeout: Duration) -> PollWindow {
        PollWindow::from_parts(timeout, self.poll_interval)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| ConfigError::InvalidUtf8(name.to_string()))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty(name.to_string())),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive integer from an environment variable string.
///
/// # Errors
///
/// Returns an error when the value is non-numeric or zero.
fn parse_positive(name: &str, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name: name.to_string(),
        reason: "must be a positive integer".to_string(),
    })?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            name: name.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
