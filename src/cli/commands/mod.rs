//! CLI command dispatch and handlers.

pub mod run;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::FlagWarError;

/// Dispatches a parsed CLI invocation to its handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), FlagWarError> {
    match cli.command {
        Commands::Run(args) => run::run(&args).await,
        Commands::Validate(args) => validate::validate(&args),
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
