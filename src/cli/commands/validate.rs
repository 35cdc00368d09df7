//! `flagwar validate`: check scenario files without running them.

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{ConfigError, FlagWarError, Severity, ValidationIssue};

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    warnings: Vec<WarningReport>,
}

#[derive(Debug, Serialize)]
struct WarningReport {
    location: Option<String>,
    message: String,
}

impl From<&LoadWarning> for WarningReport {
    fn from(warning: &LoadWarning) -> Self {
        Self {
            location: warning.location.clone(),
            message: warning.message.clone(),
        }
    }
}

/// Validates every file, stopping at the first invalid one.
///
/// # Errors
///
/// Returns the first load or validation failure. With `--strict`,
/// warnings fail validation too.
pub fn validate(args: &ValidateArgs) -> Result<(), FlagWarError> {
    let loader = ConfigLoader::default();
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating scenario");
        let result = loader.load(path)?;

        for warning in &result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }

        if args.strict && !result.warnings.is_empty() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result
                    .warnings
                    .iter()
                    .map(|w| ValidationIssue {
                        path: w.location.clone().unwrap_or_default(),
                        message: w.message.clone(),
                        severity: Severity::Error,
                    })
                    .collect(),
            }
            .into());
        }

        reports.push(FileReport {
            file: path.display().to_string(),
            warnings: result.warnings.iter().map(WarningReport::from).collect(),
        });
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                println!("{}: ok ({} warnings)", report.file, report.warnings.len());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}
