//! Report command implementation

use clap::Args;
use serde_json::Number;
use std::path::PathBuf;

use super::{is_terminal, load_config, CredentialArgs};
use crate::config::SettingsOverrides;
use crate::core::{amount_text, is_negative, Report, ReportError};
use crate::report;

/// Arguments for the report command
#[derive(Args, Debug, Default, Clone)]
pub struct ReportArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Disable ANSI colors in text output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Number of accounts whose transactions are fetched at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Keep going when an account's transactions fail; the account is flagged
    /// and the command still exits non-zero
    #[arg(long)]
    pub partial: bool,
}

impl ReportArgs {
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }

    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            request_timeout_secs: self.timeout,
            concurrency: self.concurrency,
            partial: self.partial,
        }
    }
}

/// Output format enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {}. Use 'text' or 'json'", s)),
        }
    }
}

/// Run the report command
pub async fn run(
    args: ReportArgs,
    credentials: &CredentialArgs,
    settings: Option<PathBuf>,
) -> anyhow::Result<()> {
    let format = args.output_format();
    let config = load_config(credentials, settings.as_deref(), &args.overrides())?;

    tracing::debug!(
        "Running report: host={}, format={:?}, concurrency={}, policy={:?}",
        config.credentials.host,
        format,
        config.concurrency,
        config.on_transaction_error
    );

    let report = match report::generate(&config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Report failed during {}: {}", e.stage(), e);
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Text => println!("{}", render_text(&report, !args.no_color && is_terminal())),
        OutputFormat::Json => println!("{}", render_json(&report, args.pretty)?),
    }

    if !report.is_complete() {
        return Err(ReportError::Incomplete {
            failed: report.failed_accounts(),
        }
        .into());
    }

    Ok(())
}

pub fn render_json(report: &Report, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
}

/// Render the report as text, one block per account
pub fn render_text(report: &Report, use_color: bool) -> String {
    if report.is_empty() {
        return "No accounts.".to_string();
    }

    let mut sections = Vec::new();

    for entry in report.entries() {
        let mut lines = Vec::new();

        let header = format!("Account {}", entry.acc_number);
        let header = if use_color {
            format!("\x1b[1m{}\x1b[0m", header)
        } else {
            header
        };
        lines.push(format!("{}  balance {}", header, amount_text(&entry.amount)));

        if entry.transactions.is_empty() {
            lines.push("  (no transactions)".to_string());
        }
        for tx in &entry.transactions {
            lines.push(format!(
                "  {:<32} {} {}",
                tx.label,
                format_amount(&tx.amount, use_color),
                tx.currency
            ));
        }

        if let Some(ref error) = entry.error {
            let line = format!("  Error: {}", error);
            lines.push(if use_color {
                format!("\x1b[31m{}\x1b[0m", line)
            } else {
                line
            });
        }

        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

fn format_amount(amount: &Number, use_color: bool) -> String {
    let text = format!("{:>12}", amount_text(amount));
    if use_color && is_negative(amount) {
        format!("\x1b[31m{}\x1b[0m", text)
    } else {
        text
    }
}
