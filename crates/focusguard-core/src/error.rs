//! Core error types for focusguard-core.
//!
//! Configuration and transition errors are returned to the caller of the
//! command surface. Enforcement errors are produced by [`EnforcementPort`]
//! implementations and are absorbed by the controller; they never reach the
//! state machine.
//!
//! [`EnforcementPort`]: crate::enforcement::EnforcementPort

use std::path::PathBuf;
use thiserror::Error;

use crate::enforcement::Capability;
use crate::session::Phase;

/// Core error type for focusguard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bad duration input. No state change happened.
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// The requested operation is not allowed from the current phase.
    #[error("Cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn invalid_config(field: &str, message: impl Into<String>) -> Self {
        CoreError::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Failure of a single enforcement capability call.
///
/// All variants are recoverable: the caller logs them and carries on in
/// degraded mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnforcementError {
    /// No running process matched the requested name or path.
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    /// The OS refused the operation (typically a non-admin session).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The capability is missing on this host (no audio device, unsupported
    /// platform, ...).
    #[error("{capability} unavailable: {reason}")]
    Unavailable {
        capability: Capability,
        reason: String,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
