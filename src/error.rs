//! Error types for reconkit operations.
//!
//! This module defines [`ResolverError`], the error type used throughout
//! the installer, the copyable [`ErrorKind`] classification stored in
//! attempt logs, and a [`Result`] type alias.
//!
//! # Error Handling Strategy
//!
//! - Every external-process call site converts raw failures into one of the
//!   command variants below
//! - Strategy chains and pipeline steps record errors instead of propagating
//!   them; only [`ResolverError::Interrupted`] is allowed to end a run early
//! - Use `anyhow::Error` (via `ResolverError::Other`) for unexpected errors

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Core error type for reconkit operations.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The program is not installed or not on the augmented PATH.
    #[error("Command not found: {program}")]
    CommandNotFound { program: String },

    /// The command ran and exited non-zero.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// The command exceeded its timeout and was killed.
    #[error("Command timed out after {timeout:?}: {command}")]
    CommandTimedOut { command: String, timeout: Duration },

    /// A step needs the network and the reachability probe failed.
    #[error("Network unavailable: {message}")]
    NetworkUnavailable { message: String },

    /// The operating system or sudo refused the operation.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// A configuration file on the host is in an unexpected state.
    #[error("Configuration corrupt at {path}: {message}")]
    ConfigurationCorrupt { path: PathBuf, message: String },

    /// The user pressed Ctrl-C.
    #[error("Interrupted by user")]
    Interrupted,

    /// Installer configuration file not found at an explicitly given path.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse the installer configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid installer configuration values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for reconkit operations.
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Failure classification recorded in attempt logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CommandNotFound,
    CommandFailed,
    CommandTimedOut,
    NetworkUnavailable,
    PermissionDenied,
    ConfigurationCorrupt,
    /// The method ran cleanly but the tool still failed its check.
    VerificationFailed,
    Interrupted,
    Other,
}

impl ErrorKind {
    /// Short human label used in summaries.
    pub fn label(self) -> &'static str {
        match self {
            Self::CommandNotFound => "not found",
            Self::CommandFailed => "failed",
            Self::CommandTimedOut => "timed out",
            Self::NetworkUnavailable => "no network",
            Self::PermissionDenied => "permission denied",
            Self::ConfigurationCorrupt => "configuration corrupt",
            Self::VerificationFailed => "not verified",
            Self::Interrupted => "interrupted",
            Self::Other => "error",
        }
    }
}

impl ResolverError {
    /// Classify this error for the attempt log.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CommandNotFound { .. } => ErrorKind::CommandNotFound,
            Self::CommandFailed { .. } => ErrorKind::CommandFailed,
            Self::CommandTimedOut { .. } => ErrorKind::CommandTimedOut,
            Self::NetworkUnavailable { .. } => ErrorKind::NetworkUnavailable,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::ConfigurationCorrupt { .. } => ErrorKind::ConfigurationCorrupt,
            Self::Interrupted => ErrorKind::Interrupted,
            Self::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorKind::PermissionDenied
            }
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::CommandNotFound,
            Self::ConfigNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::ConfigValidationError { .. }
            | Self::Io(_)
            | Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether this error must end the run instead of being recorded.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
