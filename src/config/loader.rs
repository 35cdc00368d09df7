//! Scenario loading.
//!
//! Reads a YAML scenario from disk, enforces size limits, deserializes it
//! and runs the [`Validator`].

use std::path::Path;

use serde_yaml::Value;

use crate::config::schema::ScenarioConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Limits that keep hostile or runaway scenarios in check.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum scenario file size in bytes.
    pub max_config_size: usize,

    /// Maximum number of territories.
    pub max_territories: usize,

    /// Maximum number of scripted attacks.
    pub max_attacks: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("FLAGWAR_MAX_CONFIG_SIZE", 10 * 1024 * 1024),
            max_territories: env_or("FLAGWAR_MAX_TERRITORIES", 100_000),
            max_attacks: env_or("FLAGWAR_MAX_ATTACKS", 10_000),
        }
    }
}

/// A loaded, validated scenario.
#[derive(Debug)]
pub struct LoadResult {
    /// The scenario.
    pub scenario: ScenarioConfig,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during scenario loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Scenario loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
}

impl ConfigLoader {
    /// Creates a loader with the given limits.
    #[must_use]
    pub const fn new(limits: ConfigLimits) -> Self {
        Self { limits }
    }

    /// Reads, parses and validates a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, is not valid
    /// YAML for a scenario, or fails validation.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.limits.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.limits.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw, path)
    }

    /// Parses and validates scenario text. `path` is used for messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is empty, is not valid YAML for a
    /// scenario, or fails validation.
    pub fn load_str(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let root: Value = serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

        if root.is_null() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "scenario file is empty".to_string(),
            });
        }

        let scenario: ScenarioConfig =
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: format!("failed to deserialize scenario: {e}"),
            })?;

        let result = Validator::new().validate(&scenario, &self.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }

        let warnings = result
            .warnings
            .into_iter()
            .map(|issue| LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            })
            .collect();

        Ok(LoadResult { scenario, warnings })
    }
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
