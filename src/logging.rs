//! Logging setup
//!
//! Logs go to stderr so stdout only carries the report.

use tracing_subscriber::EnvFilter;

/// Map a `--log-level` value (including its aliases) to a tracing level name
pub fn level_name(level: Option<&str>, verbose: bool) -> &'static str {
    match level.map(|l| l.to_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("verbose") | Some("debug") => "debug",
        Some("info") => "info",
        Some("warning") | Some("warn") => "warn",
        Some("error") | Some("critical") => "error",
        _ if verbose => "debug",
        _ => "warn",
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the flags.
pub fn init(verbose: bool, json: bool, level: Option<&str>) -> anyhow::Result<()> {
    let default_directive = format!("bankreport={}", level_name(level, verbose));
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_directive))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow::anyhow!("{}", e))
}
