// system-tests/src/config/env.rs
// ============================================================================
// Module: Acceptance Environment
// Description: Config-file and environment backed settings for live suites.
// Purpose: Centralize credential loading with strict UTF-8 validation.
// Dependencies: cf-acceptance-harness, serde, serde_json
// ============================================================================

//! ## Overview
//! The config file carries the platform endpoint and admin credentials.
//! Environment values are parsed with strict UTF-8 enforcement; invalid or
//! blank values fail closed instead of silently falling back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use cf_acceptance_harness::Cli;
use cf_acceptance_harness::CommandSpec;
use cf_acceptance_harness::HarnessConfig;
use cf_acceptance_harness::config::read_env_strict;
use serde::Deserialize;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// CLI binary used when neither the config file nor the environment names one.
pub const DEFAULT_CF_BINARY: &str = "cf";

/// Environment keys for acceptance configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceEnv {
    /// Path to the JSON config file.
    Config,
    /// Optional CLI binary override.
    CfBinary,
    /// Optional artifact run root override.
    RunRoot,
}

impl AcceptanceEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "CONFIG",
            Self::CfBinary => "CF_ACCEPTANCE_CF_BINARY",
            Self::RunRoot => "CF_ACCEPTANCE_RUN_ROOT",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// On-disk shape of the config file. Unknown keys are ignored so one file can
/// be shared with other acceptance tooling.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    /// Platform API endpoint.
    api: String,
    /// Admin user name.
    admin_user: String,
    /// Admin password.
    admin_password: String,
    /// Pass `--skip-ssl-validation` when targeting the API.
    #[serde(default)]
    skip_ssl_validation: bool,
    /// CLI binary path.
    #[serde(default)]
    cf_binary: Option<PathBuf>,
    /// Minimum assertion timeout in seconds.
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

/// Typed acceptance configuration.
///
/// # Invariants
/// - `api` and `admin_user` are non-blank.
/// - `timeout`, when present, is non-zero.
#[derive(Clone, PartialEq, Eq)]
pub struct AcceptanceConfig {
    /// Platform API endpoint.
    pub api: String,
    /// Admin user name.
    pub admin_user: String,
    /// Admin password. Never rendered by `Debug`.
    pub admin_password: String,
    /// Pass `--skip-ssl-validation` when targeting the API.
    pub skip_ssl_validation: bool,
    /// CLI binary path or name resolved through `PATH`.
    pub cf_binary: PathBuf,
    /// Minimum assertion timeout.
    pub timeout: Option<Duration>,
    /// Optional artifact run root override.
    pub run_root: Option<PathBuf>,
}

impl fmt::Debug for AcceptanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptanceConfig")
            .field("api", &self.api)
            .field("admin_user", &self.admin_user)
            .field("admin_password", &"<redacted>")
            .field("skip_ssl_validation", &self.skip_ssl_validation)
            .field("cf_binary", &self.cf_binary)
            .field("timeout", &self.timeout)
            .field("run_root", &self.run_root)
            .finish()
    }
}

impl AcceptanceConfig {
    /// Loads the config file named by `CONFIG` and applies env overrides.
    ///
    /// Returns `Ok(None)` when `CONFIG` is unset.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8 or is
    /// blank, or when the config file cannot be read or fails validation.
    pub fn load() -> Result<Option<Self>, String> {
        let Some(path) = read_env_nonempty(AcceptanceEnv::Config.as_str())? else {
            return Ok(None);
        };
        let mut config = Self::from_file(Path::new(&path))?;
        if let Some(binary) = read_env_nonempty(AcceptanceEnv::CfBinary.as_str())? {
            config.cf_binary = PathBuf::from(binary);
        }
        config.run_root = read_env_nonempty(AcceptanceEnv::RunRoot.as_str())?.map(PathBuf::from);
        Ok(Some(config))
    }

    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or fails validation.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let bytes = fs::read(path).map_err(|err| format!("read {}: {err}", path.display()))?;
        Self::from_json(&bytes).map_err(|err| format!("{}: {err}", path.display()))
    }

    /// Parses and validates config JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed, a required field is
    /// blank, or `timeout_seconds` is zero.
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let file: ConfigFile = serde_json::from_slice(bytes)
            .map_err(|err| format!("invalid acceptance config: {err}"))?;
        if file.api.trim().is_empty() {
            return Err("api must not be empty".to_string());
        }
        if file.admin_user.trim().is_empty() {
            return Err("admin_user must not be empty".to_string());
        }
        let timeout = match file.timeout_seconds {
            Some(0) => return Err("timeout_seconds must be greater than zero".to_string()),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };
        Ok(Self {
            api: file.api,
            admin_user: file.admin_user,
            admin_password: file.admin_password,
            skip_ssl_validation: file.skip_ssl_validation,
            cf_binary: file.cf_binary.unwrap_or_else(|| PathBuf::from(DEFAULT_CF_BINARY)),
            timeout,
            run_root: None,
        })
    }

    /// Arguments that point the CLI at the configured API.
    #[must_use]
    pub fn api_args(&self) -> Vec<String> {
        let mut args = vec!["api".to_string(), self.api.clone()];
        if self.skip_ssl_validation {
            args.push("--skip-ssl-validation".to_string());
        }
        args
    }

    /// Command that authenticates as the admin user; the password is withheld
    /// from every rendered command line.
    #[must_use]
    pub fn auth_command(&self, cli: &Cli) -> CommandSpec {
        cli.command(["auth", self.admin_user.as_str()]).secret_arg(self.admin_password.as_str())
    }

    /// Harness settings from the environment, with the configured timeout as
    /// a floor on the default assertion timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the harness environment is invalid.
    pub fn harness_config(&self) -> Result<HarnessConfig, String> {
        let config = HarnessConfig::load().map_err(|err| err.to_string())?;
        Ok(match self.timeout {
            Some(timeout) => config.with_minimum_timeout(timeout),
            None => config,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or not valid UTF-8.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name).map_err(|err| err.to_string())? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}
