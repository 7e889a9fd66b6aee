//! Configuration for BankReport
//!
//! Credentials come from the environment (or a `.env` file) and CLI flags.
//! Tunables come from an optional `settings.json`:
//! - Request timeout
//! - Per-account fetch concurrency
//! - What to do when one account's transactions fail
//!
//! Everything is validated once into a [`Config`] that is passed down explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration problems detected before any request is sent
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("HOST '{value}' is not a valid URL: {reason}")]
    InvalidHost { value: String, reason: String },

    #[error("HOST must be an http or https URL, got '{0}'")]
    UnsupportedScheme(String),

    #[error("{0} must be at least 1")]
    Zero(&'static str),

    #[error("Could not read settings file {}: {reason}", .path.display())]
    SettingsRead { path: PathBuf, reason: String },

    #[error("Invalid settings file {}: {reason}", .path.display())]
    SettingsParse { path: PathBuf, reason: String },
}

/// What the report does when one account's transaction fetch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionErrorPolicy {
    /// Stop the whole run at the first failing account
    #[default]
    Abort,
    /// Keep the account with what was fetched and flag the error
    Partial,
}

/// Raw credential inputs, before validation
#[derive(Debug, Clone, Default)]
pub struct CredentialInputs {
    pub host: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub secret: Option<String>,
}

/// Validated API credentials, immutable for the run
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: Url,
    pub login: String,
    pub password: String,
    pub client_id: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host.as_str())
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Validate raw inputs. All missing or blank fields are reported together,
    /// named after their environment variables.
    pub fn from_inputs(inputs: CredentialInputs) -> Result<Self, ConfigError> {
        fn take(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
            match value {
                Some(v) if !v.trim().is_empty() => v,
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        }

        let mut missing = Vec::new();
        let host = take(inputs.host, "HOST", &mut missing);
        let login = take(inputs.login, "USER_LOGIN", &mut missing);
        let password = take(inputs.password, "PASSWORD", &mut missing);
        let client_id = take(inputs.client_id, "CLIENT_ID", &mut missing);
        let secret = take(inputs.secret, "SECRET", &mut missing);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Self {
            host: parse_host(&host)?,
            login,
            password,
            client_id,
            secret,
        })
    }
}

fn parse_host(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|e| ConfigError::InvalidHost {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme(value.to_string())),
    }
}

/// Tunables loaded from `settings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// How many accounts may have their transactions fetched at once
    pub concurrency: usize,

    /// Behaviour when an account's transaction fetch fails
    pub on_transaction_error: TransactionErrorPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            concurrency: 1,
            on_transaction_error: TransactionErrorPolicy::Abort,
        }
    }
}

/// Values given on the command line, which win over the settings file
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub request_timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub partial: bool,
}

impl Settings {
    /// Get the default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("BankReport").join("settings.json"))
    }

    /// Load settings.
    ///
    /// An explicit path must exist. The default path is optional and falls back
    /// to defaults when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::settings_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SettingsRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::SettingsParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn with_overrides(mut self, overrides: &SettingsOverrides) -> Self {
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(n) = overrides.concurrency {
            self.concurrency = n;
        }
        if overrides.partial {
            self.on_transaction_error = TransactionErrorPolicy::Partial;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Zero("concurrency"));
        }
        Ok(())
    }
}

/// Everything a run needs, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub request_timeout: Duration,
    pub concurrency: usize,
    pub on_transaction_error: TransactionErrorPolicy,
}

impl Config {
    pub fn new(credentials: Credentials, settings: &Settings) -> Result<Self, ConfigError> {
        settings.validate()?;

        Ok(Self {
            credentials,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            concurrency: settings.concurrency,
            on_transaction_error: settings.on_transaction_error,
        })
    }
}
