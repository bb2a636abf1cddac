//! Error types for teststack operations.
//!
//! This module defines [`TeststackError`], the primary error type used
//! throughout the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `TeststackError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `TeststackError::Other`) for unexpected errors
//! - A step command exiting non-zero is *not* an error; exit codes are summed
//!   by the resolver and only turned into a process exit code by the CLI

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for teststack operations.
#[derive(Debug, Error)]
pub enum TeststackError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// `--step` named a step that is not configured.
    #[error("{step} is not an available step")]
    UnknownStep { step: String },

    /// Step dependency cycle detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// `[client].name` does not name a supported container engine.
    #[error("Unknown container client: {name}")]
    UnknownClient { name: String },

    /// `tests.min_version` is newer than this binary.
    #[error("Current teststack version is too low, upgrade to at least {required} (running {current})")]
    VersionTooLow { required: String, current: String },

    /// `build --service` named a service that is not configured.
    #[error("Service {service} is not defined")]
    ServiceNotDefined { service: String },

    /// An image was still missing after its build.
    #[error("Failed to build image {tag}!")]
    BuildFailed { tag: String },

    /// An engine or shell command could not be run.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// The container engine reported a problem with a container.
    #[error("Container '{name}': {message}")]
    ContainerError { name: String, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TeststackError {
    /// Process exit code the CLI uses when this error ends a command.
    pub fn exit_code(&self) -> i32 {
        match self {
            TeststackError::VersionTooLow { .. } => 10,
            TeststackError::ServiceNotDefined { .. } | TeststackError::BuildFailed { .. } => 11,
            _ => 1,
        }
    }
}

/// Result type alias for teststack operations.
pub type Result<T> = std::result::Result<T, TeststackError>;
