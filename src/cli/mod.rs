//! CLI module - command-line interface
//!
//! - `bankreport` - defaults to the report command
//! - `bankreport accounts` - print the account list only
//! - `bankreport config` - validate and inspect configuration

pub mod accounts;
pub mod config;
pub mod report;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    Config, ConfigError, CredentialInputs, Credentials, Settings, SettingsOverrides,
};
use crate::core::ReportError;

/// Exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const AUTH_FAILURE: i32 = 3;
    pub const FETCH_FAILURE: i32 = 4;
    pub const TIMEOUT: i32 = 5;
}

/// BankReport - print every account and its transactions from a bank API
///
/// Credentials are read from the environment (or a `.env` file) unless given as flags.
/// Defaults to the report command when no subcommand is given.
#[derive(Parser, Debug)]
#[command(name = "bankreport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // === Global flags ===

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit machine-readable logs (JSON) to stderr
    #[arg(long = "json-output", global = true)]
    pub json_output: bool,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", global = true, value_parser = ["trace", "verbose", "debug", "info", "warning", "warn", "error", "critical"])]
    pub log_level: Option<String>,

    /// Settings file (defaults to <config dir>/BankReport/settings.json)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Top-level args for the default report command ===
    #[command(flatten)]
    pub report: report::ReportArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every account with its transactions (default command)
    Report(report::ReportArgs),

    /// Print the account list without transactions
    Accounts(accounts::AccountsArgs),

    /// Validate and inspect configuration
    Config(config::ConfigArgs),
}

/// API credentials
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Bank API base URL
    #[arg(long, env = "HOST", global = true)]
    pub host: Option<String>,

    /// User login
    #[arg(long = "user-login", env = "USER_LOGIN", global = true)]
    pub user_login: Option<String>,

    /// User password
    #[arg(long, env = "PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// OAuth client id
    #[arg(long = "client-id", env = "CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,
}

impl CredentialArgs {
    pub fn to_inputs(&self) -> CredentialInputs {
        CredentialInputs {
            host: self.host.clone(),
            login: self.user_login.clone(),
            password: self.password.clone(),
            client_id: self.client_id.clone(),
            secret: self.secret.clone(),
        }
    }
}

/// Validate credentials and settings into a [`Config`]
pub fn load_config(
    credentials: &CredentialArgs,
    settings_path: Option<&std::path::Path>,
    overrides: &SettingsOverrides,
) -> Result<Config, ConfigError> {
    let credentials = Credentials::from_inputs(credentials.to_inputs())?;
    let settings = Settings::load(settings_path)?.with_overrides(overrides);
    Config::new(credentials, &settings)
}

/// Pick the exit code for a failed command from its error chain
pub fn exit_code_for(e: &anyhow::Error) -> i32 {
    for cause in e.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit_codes::CONFIG_ERROR;
        }
        if let Some(err) = cause.downcast_ref::<ReportError>() {
            return report_exit_code(err);
        }
    }
    exit_codes::UNEXPECTED_FAILURE
}

fn report_exit_code(err: &ReportError) -> i32 {
    if err.is_timeout() {
        return exit_codes::TIMEOUT;
    }
    match err {
        ReportError::Client(_) => exit_codes::UNEXPECTED_FAILURE,
        ReportError::Auth(_) => exit_codes::AUTH_FAILURE,
        ReportError::Accounts(_)
        | ReportError::Transactions { .. }
        | ReportError::Incomplete { .. } => exit_codes::FETCH_FAILURE,
    }
}

/// Check if stdout is a terminal
pub(crate) fn is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
