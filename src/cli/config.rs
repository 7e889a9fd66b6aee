//! Config command implementation
//!
//! Utilities for validating and inspecting configuration.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use super::CredentialArgs;
use crate::config::{ConfigError, Credentials, Settings};

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Check credentials and the settings file without contacting the bank
    Validate,
    /// Dump effective settings to stdout (credentials are never printed)
    Dump {
        /// Output format: json or toml
        #[arg(short, long, default_value = "json")]
        format: String,
    },
    /// Show the settings file path
    Path,
}

/// Run the config command
pub async fn run(
    args: ConfigArgs,
    credentials: &CredentialArgs,
    settings: Option<PathBuf>,
) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Validate => validate_config(credentials, settings.as_deref()),
        ConfigCommand::Dump { format } => dump_config(settings.as_deref(), &format),
        ConfigCommand::Path => show_paths(settings.as_deref()),
    }
}

/// Validate credentials and settings, printing one line per check
fn validate_config(credentials: &CredentialArgs, settings_path: Option<&Path>) -> anyhow::Result<()> {
    let mut errors: Vec<ConfigError> = Vec::new();

    print!("Checking credentials... ");
    match Credentials::from_inputs(credentials.to_inputs()) {
        Ok(creds) => println!("OK ({})", creds.host),
        Err(e) => {
            println!("INVALID");
            errors.push(e);
        }
    }

    print!("Checking settings... ");
    match Settings::load(settings_path).and_then(|s| s.validate().map(|_| s)) {
        Ok(_) => match resolve_path(settings_path) {
            Some(path) if path.exists() => println!("OK"),
            _ => println!("NOT FOUND (using defaults)"),
        },
        Err(e) => {
            println!("INVALID");
            errors.push(e);
        }
    }

    println!();
    if errors.is_empty() {
        println!("Configuration is valid.");
        return Ok(());
    }

    println!("Errors:");
    for e in &errors {
        println!("  - {}", e);
    }

    let count = errors.len();
    let first = errors.remove(0);
    Err(anyhow::Error::from(first)
        .context(format!("Configuration validation failed with {} error(s).", count)))
}

/// Dump effective settings to stdout
fn dump_config(settings_path: Option<&Path>, format: &str) -> anyhow::Result<()> {
    let settings = Settings::load(settings_path)?;
    println!("{}", render_settings(&settings, format)?);
    Ok(())
}

fn render_settings(settings: &Settings, format: &str) -> anyhow::Result<String> {
    match format.to_lowercase().as_str() {
        "json" => Ok(serde_json::to_string_pretty(settings)?),
        "toml" => Ok(toml::to_string_pretty(settings)?),
        _ => anyhow::bail!("Unknown format '{}'. Supported formats: json, toml", format),
    }
}

fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(Settings::settings_path)
}

/// Show the settings file path
fn show_paths(settings_path: Option<&Path>) -> anyhow::Result<()> {
    match resolve_path(settings_path) {
        Some(path) => {
            let exists = if path.exists() { "" } else { " (not found)" };
            println!("Settings: {}{}", path.display(), exists);
        }
        None => println!("Settings: (could not determine path)"),
    }
    Ok(())
}
