//! Client configuration and per-operation diagnostics.
//!
//! Configuration is loaded from a TOML file; the password is never stored
//! in the file and is resolved from an environment variable named by the
//! `password_env` key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Default environment variable holding the Remedy password.
pub const DEFAULT_PASSWORD_ENV: &str = "ARWO_PASSWORD";

/// Configuration errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The password environment variable is unset or empty.
    #[error("password environment variable {env} is not set")]
    MissingPassword {
        /// Name of the environment variable that was consulted.
        env: String,
    },
}

/// On-disk configuration shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_base: String,
    credential_dir: PathBuf,
    user: String,
    #[serde(default = "default_password_env")]
    password_env: String,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_create_timeout_secs")]
    create_timeout_secs: u64,
    #[serde(default = "default_lock_wait_secs")]
    lock_wait_secs: u64,
    #[serde(default = "default_retry_attempts")]
    retry_attempts: u32,
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

/// Creation is a heavier server-side operation than modify/attach and gets
/// a longer deadline.
const fn default_create_timeout_secs() -> u64 {
    120
}

const fn default_lock_wait_secs() -> u64 {
    3
}

const fn default_retry_attempts() -> u32 {
    3
}

/// Resolved client configuration threaded through every operation.
///
/// Replaces ambient state: there is no process-global message buffer or
/// token path; everything an operation needs travels in this value plus a
/// [`Diagnostics`] accumulator.
#[derive(Debug, Clone)]
pub struct RemedyConfig {
    /// Base URL of the Remedy instance, without a trailing slash.
    pub api_base: String,

    /// Directory holding per-user token files and refresh lock markers.
    pub credential_dir: PathBuf,

    /// Remedy account the client authenticates as.
    pub user: String,

    /// Password for `user`. Only ever exposed to build the login body.
    pub password: SecretString,

    /// Deadline for modify, attach, resolve, and lookup requests.
    pub request_timeout: Duration,

    /// Deadline for work-order creation.
    pub create_timeout: Duration,

    /// Bounded wait for the refresh lock, and the deferral interval for a
    /// process that observes another refresh in flight.
    pub lock_wait: Duration,

    /// Retry budget for one logical operation.
    pub retry_attempts: u32,
}

impl RemedyConfig {
    /// Creates a configuration with default timeouts and retry budget.
    #[must_use]
    pub fn new(
        api_base: impl Into<String>,
        credential_dir: impl Into<PathBuf>,
        user: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            api_base: normalize_base(api_base.into()),
            credential_dir: credential_dir.into(),
            user: user.into(),
            password,
            request_timeout: Duration::from_secs(default_request_timeout_secs()),
            create_timeout: Duration::from_secs(default_create_timeout_secs()),
            lock_wait: Duration::from_secs(default_lock_wait_secs()),
            retry_attempts: default_retry_attempts(),
        }
    }

    /// Loads configuration from a TOML file and resolves the password from
    /// the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// password environment variable is unset.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string and resolves the password
    /// from the environment variable named by `password_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the password environment
    /// variable is unset or empty.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let password = match std::env::var(&file.password_env) {
            Ok(value) if !value.is_empty() => SecretString::from(value),
            _ => {
                return Err(ConfigError::MissingPassword {
                    env: file.password_env,
                });
            },
        };
        Ok(Self::resolve(file, password))
    }

    fn resolve(file: ConfigFile, password: SecretString) -> Self {
        Self {
            api_base: normalize_base(file.api_base),
            credential_dir: file.credential_dir,
            user: file.user,
            password,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            create_timeout: Duration::from_secs(file.create_timeout_secs),
            lock_wait: Duration::from_secs(file.lock_wait_secs),
            retry_attempts: file.retry_attempts,
        }
    }
}

fn normalize_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// Per-operation diagnostic accumulator.
///
/// Collects warnings and per-attempt failure text over the life of one
/// logical operation so that an exhausted retry loop can report everything
/// that went wrong, not just the final attempt.
#[derive(Debug, Default)]
pub struct Diagnostics {
    notes: Vec<String>,
}

impl Diagnostics {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one diagnostic note.
    pub fn record(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// All recorded notes, oldest first.
    #[must_use]
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Joins every note into one report line.
    #[must_use]
    pub fn summary(&self) -> String {
        self.notes.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            api_base = "https://remedy.example.com/"
            credential_dir = "/var/lib/arwo"
            user = "svc_arwo"
            "#,
        )
        .unwrap();
        let config = RemedyConfig::resolve(file, SecretString::from("pw".to_string()));
        assert_eq!(config.api_base, "https://remedy.example.com");
        assert_eq!(config.user, "svc_arwo");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.create_timeout, Duration::from_secs(120));
        assert_eq!(config.lock_wait, Duration::from_secs(3));
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_parse_with_overrides() {
        let file: ConfigFile = toml::from_str(
            r#"
            api_base = "https://remedy.example.com"
            credential_dir = "/var/lib/arwo"
            user = "svc_arwo"
            password_env = "OTHER_VAR"
            request_timeout_secs = 10
            create_timeout_secs = 60
            lock_wait_secs = 5
            retry_attempts = 2
            "#,
        )
        .unwrap();
        assert_eq!(file.password_env, "OTHER_VAR");
        let config = RemedyConfig::resolve(file, SecretString::from("pw".to_string()));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.create_timeout, Duration::from_secs(60));
        assert_eq!(config.lock_wait, Duration::from_secs(5));
        assert_eq!(config.retry_attempts, 2);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str(
            r#"
            api_base = "https://remedy.example.com"
            credential_dir = "/var/lib/arwo"
            user = "svc_arwo"
            password = "never-in-the-file"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_password_env_is_an_error() {
        let result = RemedyConfig::from_toml(
            r#"
            api_base = "https://remedy.example.com"
            credential_dir = "/var/lib/arwo"
            user = "svc_arwo"
            password_env = "ARWO_TEST_UNSET_PASSWORD_VAR"
            "#,
        );
        match result {
            Err(ConfigError::MissingPassword { env }) => {
                assert_eq!(env, "ARWO_TEST_UNSET_PASSWORD_VAR");
            },
            other => panic!("expected MissingPassword, got {other:?}"),
        }
    }

    #[test]
    fn test_diagnostics_summary_joins_notes() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_empty());
        diag.record("attempt 1 failed: API error (401)");
        diag.record("refresh deferred to sibling");
        assert_eq!(
            diag.summary(),
            "attempt 1 failed: API error (401); refresh deferred to sibling"
        );
    }
}
