//! Accounts command implementation
//!
//! Authenticates and lists accounts without fetching transactions.

use clap::Args;
use std::path::PathBuf;

use super::report::OutputFormat;
use super::{load_config, CredentialArgs};
use crate::config::SettingsOverrides;
use crate::core::{amount_text, Account};
use crate::report::Session;

/// Arguments for the accounts command
#[derive(Args, Debug, Default)]
pub struct AccountsArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Run the accounts command
pub async fn run(
    args: AccountsArgs,
    credentials: &CredentialArgs,
    settings: Option<PathBuf>,
) -> anyhow::Result<()> {
    let overrides = SettingsOverrides {
        request_timeout_secs: args.timeout,
        ..SettingsOverrides::default()
    };
    let config = load_config(credentials, settings.as_deref(), &overrides)?;

    let session = Session::open(&config).await?;
    let accounts = session.accounts().await?;

    let format = if args.json { OutputFormat::Json } else { args.format };
    match format {
        OutputFormat::Text => println!("{}", render_text(&accounts)),
        OutputFormat::Json => {
            let output = if args.pretty {
                serde_json::to_string_pretty(&accounts)?
            } else {
                serde_json::to_string(&accounts)?
            };
            println!("{}", output);
        }
    }

    Ok(())
}

/// One line per account: number and balance
pub fn render_text(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts.".to_string();
    }

    let width = accounts
        .iter()
        .map(|a| a.acc_number.len())
        .max()
        .unwrap_or(0);

    accounts
        .iter()
        .map(|a| {
            format!(
                "{:<width$}  {:>12}",
                a.acc_number,
                amount_text(&a.amount),
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
