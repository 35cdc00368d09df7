//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Flag war territory-conquest engine.
#[derive(Parser, Debug)]
#[command(name = "flagwar", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "FLAGWAR_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true, env = "FLAGWAR_LOG_FORMAT")]
    pub log_format: OutputFormat,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario: build the map, launch its attacks, wait for every
    /// contest to resolve and print who holds what.
    Run(RunArgs),

    /// Validate scenario files without running them.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario YAML file.
    #[arg(env = "FLAGWAR_SCENARIO")]
    pub scenario: PathBuf,

    /// War state file; restored on start and saved while running.
    #[arg(long, env = "FLAGWAR_STATE")]
    pub state: Option<PathBuf>,

    /// Write the JSONL event stream to this file.
    #[arg(long, env = "FLAGWAR_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on 127.0.0.1:<port>.
    #[arg(long, env = "FLAGWAR_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Format of the final ownership summary.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Ignore saved state; the final save replaces it.
    #[arg(long, requires = "state")]
    pub reset: bool,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Scenario files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_with_scenario() {
        let cli = Cli::try_parse_from(["flagwar", "run", "war.yaml"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenario, PathBuf::from("war.yaml"));
        assert!(args.state.is_none());
        assert_eq!(args.format, OutputFormat::Human);
    }

    #[test]
    fn run_with_everything() {
        let cli = Cli::try_parse_from([
            "flagwar",
            "-vv",
            "run",
            "war.yaml",
            "--state",
            "war.json",
            "--events-file",
            "events.jsonl",
            "--metrics-port",
            "9100",
            "--format",
            "json",
            "--reset",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.metrics_port, Some(9100));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.reset);
    }

    #[test]
    fn reset_requires_state() {
        let cli = Cli::try_parse_from(["flagwar", "run", "war.yaml", "--reset"]);
        assert!(cli.is_err());
    }

    #[test]
    fn validate_requires_files() {
        assert!(Cli::try_parse_from(["flagwar", "validate"]).is_err());
        let cli = Cli::try_parse_from(["flagwar", "validate", "a.yaml", "b.yaml", "--strict"]).unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.files.len(), 2);
        assert!(args.strict);
    }

    #[test]
    fn help_output() {
        let err = Cli::try_parse_from(["flagwar", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
