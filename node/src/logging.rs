//! Log setup for `stockproof-node`.
//!
//! Reports and `--json` outcomes go to stdout. Everything `tracing` emits goes
//! to stderr, so `stockproof-node query --item 001 --json | jq` stays clean.
//!
//! What shows up at each level:
//!
//! | level | source |
//! |-------|--------|
//! | `info` | config source, node init, proposal handled; round committed, aggregate verified |
//! | `warn` | round rejected, record mismatch or missing, vote timed out |
//! | `debug` | every vote, every partial signature, hash digests |
//!
//! The default keeps the library at `warn`. Use `RUST_LOG=stockproof_protocol=debug`
//! to watch individual votes and partials.

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "stockproof_node=info,stockproof_protocol=warn";

/// `--log-format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored, with source locations.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(default_filter: &str, format: LogFormat) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;

    tracing::debug!(?format, "logging ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_an_error() {
        // The first call may lose to another test thread, the second never wins.
        let _ = init_logging(DEFAULT_FILTER, LogFormat::Json);
        assert!(init_logging(DEFAULT_FILTER, LogFormat::Pretty).is_err());
    }
}
