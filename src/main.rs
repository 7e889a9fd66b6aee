//! BankReport - accounts and transactions report from a bank API
//!
//! - Exchanges login credentials for a refresh token, then an access token
//! - Walks the paginated account list
//! - Walks each account's paginated transactions
//! - Prints the consolidated report as text or JSON

mod api;
mod cli;
mod config;
mod core;
mod logging;
mod report;

#[cfg(test)]
mod test_support;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    // Load .env before parsing so clap sees its values as environment variables
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.json_output, cli.log_level.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    let Cli {
        command,
        credentials,
        settings,
        report,
        ..
    } = cli;

    let result = rt.block_on(async {
        match command {
            Some(Commands::Report(args)) => cli::report::run(args, &credentials, settings).await,
            Some(Commands::Accounts(args)) => cli::accounts::run(args, &credentials, settings).await,
            Some(Commands::Config(args)) => cli::config::run(args, &credentials, settings).await,
            None => cli::report::run(report, &credentials, settings).await,
        }
    });

    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            cli::exit_code_for(&e)
        }
    }
}
