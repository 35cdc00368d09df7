//! Error types for `flagwar`
//!
//! Attack validation failures are plain values returned from
//! `begin_attack`; everything else (configuration, persistence, I/O)
//! rolls up into [`FlagWarError`] with a process exit code.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `flagwar` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Saved war state could not be read or written
    pub const PERSIST_ERROR: i32 = 4;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `flagwar` operations.
#[derive(Debug, Error)]
pub enum FlagWarError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Saved state could not be loaded or stored
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// A scripted attack was rejected
    #[error("attack rejected: {0}")]
    Attack(#[from] AttackError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FlagWarError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Persist(_) => ExitCode::PERSIST_ERROR,
            Self::Attack(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Attack Validation Errors
// ============================================================================

/// Reasons `begin_attack` refuses to start a contest.
///
/// Variants are listed in the order the checks run; the first failing
/// check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AttackError {
    /// Target is wilderness, or not hostile to the attacking town
    #[error("chunk does not belong to an enemy")]
    NotEnemy,

    /// Target town is on the war blacklist
    #[error("town is blacklisted from war")]
    TownBlacklisted,

    /// Target (or, in strict mode, attacking) town is not whitelisted
    #[error("town is not on the war whitelist")]
    TownNotWhitelisted,

    /// Another flag is already running on this chunk
    #[error("chunk is already under attack")]
    AlreadyUnderAttack,

    /// Chunk is already held by the attacker or an ally
    #[error("chunk already captured by your town or allies")]
    AlreadyCaptured,

    /// Border-only war and the territory is interior or a town home
    #[error("can only attack border territories")]
    NotBorderTerritory,

    /// No neighboring chunk is wilderness or friendly-held
    #[error("chunk must border wilderness or a chunk held by your town or allies")]
    ChunkNotEdge,

    /// No room above the flag for the marker
    #[error("flag placed too high, no room for the flag marker")]
    FlagTooHigh,

    /// Something blocks the sky above the flag
    #[error("flag must have clear vision of the sky")]
    SkyBlocked,

    /// Attacker already runs the maximum number of flags
    #[error("too many concurrent attacks")]
    TooManyAttacks,

    /// A start hook vetoed the attack
    #[error("attack cancelled")]
    AttackCustomCancel,
}

impl AttackError {
    /// Stable snake-case code used in metrics labels and events.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotEnemy => "not_enemy",
            Self::TownBlacklisted => "town_blacklisted",
            Self::TownNotWhitelisted => "town_not_whitelisted",
            Self::AlreadyUnderAttack => "already_under_attack",
            Self::AlreadyCaptured => "already_captured",
            Self::NotBorderTerritory => "not_border_territory",
            Self::ChunkNotEdge => "chunk_not_edge",
            Self::FlagTooHigh => "flag_too_high",
            Self::SkyBlocked => "sky_blocked",
            Self::TooManyAttacks => "too_many_attacks",
            Self::AttackCustomCancel => "attack_custom_cancel",
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "territories[2].core")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Persistence Errors
// ============================================================================

/// Failures reading or writing saved war state.
#[derive(Debug, Error)]
pub enum PersistError {
    /// I/O error on the state file
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State file is not valid JSON for the expected schema
    #[error("state file JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Background save task failed to complete
    #[error("save task failed: {0}")]
    Task(String),
}

// ============================================================================
// Collaborator Errors
// ============================================================================

/// Failure reported by a world or display collaborator.
///
/// The engine logs these and carries on; they never abort a contest.
#[derive(Debug, Clone, Error)]
#[error("{service}: {message}")]
pub struct ServiceError {
    /// Which collaborator failed (e.g. `"display"`)
    pub service: &'static str,
    /// What went wrong
    pub message: String,
}

impl ServiceError {
    /// Creates a new service error.
    #[must_use]
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `flagwar` operations.
pub type Result<T> = std::result::Result<T, FlagWarError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::PERSIST_ERROR, 4);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: FlagWarError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_persist_error_exit_code() {
        let err: FlagWarError = PersistError::Task("join".to_string()).into();
        assert_eq!(err.exit_code(), ExitCode::PERSIST_ERROR);
    }

    #[test]
    fn test_attack_error_exit_code() {
        let err: FlagWarError = AttackError::SkyBlocked.into();
        assert_eq!(err.exit_code(), ExitCode::ERROR);
        assert!(err.to_string().contains("sky"));
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: FlagWarError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_attack_error_codes_are_unique() {
        let all = [
            AttackError::NotEnemy,
            AttackError::TownBlacklisted,
            AttackError::TownNotWhitelisted,
            AttackError::AlreadyUnderAttack,
            AttackError::AlreadyCaptured,
            AttackError::NotBorderTerritory,
            AttackError::ChunkNotEdge,
            AttackError::FlagTooHigh,
            AttackError::SkyBlocked,
            AttackError::TooManyAttacks,
            AttackError::AttackCustomCancel,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "war.tick_size".to_string(),
            message: "must be greater than zero".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: must be greater than zero at war.tick_size"
        );
    }

    #[test]
    fn test_validation_issue_warning_display() {
        let issue = ValidationIssue {
            path: "war.whitelist".to_string(),
            message: "whitelist is empty".to_string(),
            severity: Severity::Warning,
        };
        assert_eq!(issue.to_string(), "warning: whitelist is empty at war.whitelist");
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::new("display", "boss bar gone");
        assert_eq!(err.to_string(), "display: boss bar gone");
    }
}
