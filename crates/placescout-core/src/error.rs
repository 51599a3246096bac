//! Core error types for PlaceScout.
//!
//! This module defines the central error type shared by the domain model and
//! the configuration layer. Subsystem crates wrap it in their own enums.

use thiserror::Error;

/// Central error type for domain and configuration operations.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid input, broken invariants)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found at an explicitly requested path
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `ScoutError`.
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScoutError::Validation("place name cannot be empty".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: place name cannot be empty"
        );

        let err = ConfigError::InvalidValue {
            field: "pipeline.max_results".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for pipeline.max_results: must be at least 1"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let scout_err: ScoutError = config_err.into();
        assert!(matches!(scout_err, ScoutError::Config(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let scout_err: ScoutError = io_err.into();
        assert!(matches!(scout_err, ScoutError::Io(_)));
    }
}
