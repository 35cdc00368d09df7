//! Logging setup for the runner.
//!
//! Everything goes to stderr through `tracing-subscriber`, keeping stdout
//! free for the ownership report. `-v` flags raise the engine's own level
//! while dependencies stay quiet; `FLAGWAR_LOG_LEVEL` replaces the whole
//! filter.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable replacing the verbosity-derived filter.
pub const LOG_LEVEL_ENV: &str = "FLAGWAR_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Filter directives for a verbosity level.
///
/// | `-v` | engine | per-tick scheduler | dependencies |
/// |------|--------|--------------------|--------------|
/// | 0    | warn   | warn               | warn         |
/// | 1    | info   | info               | warn         |
/// | 2    | debug  | info               | warn         |
/// | 3+   | trace  | trace              | info         |
///
/// Ticker start/stop lines only show up at trace.
#[must_use]
pub fn default_directives(verbosity: u8) -> String {
    match verbosity {
        0 => "warn".to_string(),
        1 => "warn,flagwar=info".to_string(),
        2 => "warn,flagwar=debug,flagwar::war::scheduler=info".to_string(),
        _ => "info,flagwar=trace".to_string(),
    }
}

fn build_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| {
        EnvFilter::try_new(default_directives(verbosity)).unwrap_or_else(|_| EnvFilter::new("warn"))
    })
}

/// Initializes the global tracing subscriber on stderr.
///
/// Later calls are ignored.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = build_filter(verbosity);

    let show_target = verbosity >= 2;

    let use_ansi = match color {
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    match format {
        LogFormat::Human => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(use_ansi)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_target(true)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
