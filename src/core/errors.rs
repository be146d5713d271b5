//! MDS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, MdsError>;

/// Top-level error type for the disk-space reclaimer.
#[derive(Debug, Error)]
pub enum MdsError {
    #[error("[MDS-1001] invalid level '{raw}': must be 1, 2, 3, or 4")]
    InvalidLevel { raw: String },

    #[error("[MDS-1002] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[MDS-1003] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[MDS-1004] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[MDS-2001] free-space measurement failed for {path}: {details}")]
    Measurement { path: PathBuf, details: String },

    #[error("[MDS-3001] removal target does not exist: {path}")]
    PathMissing { path: PathBuf },

    #[error("[MDS-3002] failed to remove {path}: {details}")]
    RemovalFailed { path: PathBuf, details: String },

    #[error("[MDS-4001] state channel unavailable: {details}")]
    Persistence { details: String },

    #[error("[MDS-4101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[MDS-4201] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse error classes used to decide whether a step may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input or configuration; reported before any destructive action.
    Configuration,
    /// The free-space probe failed or returned garbage.
    Measurement,
    /// A single delete failed; always isolated to its target.
    Removal,
    /// The state channel could not be written.
    Persistence,
    /// IO or serialization trouble outside the categories above.
    Internal,
}

impl MdsError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidLevel { .. } => "MDS-1001",
            Self::InvalidConfig { .. } => "MDS-1002",
            Self::MissingConfig { .. } => "MDS-1003",
            Self::ConfigParse { .. } => "MDS-1004",
            Self::Measurement { .. } => "MDS-2001",
            Self::PathMissing { .. } => "MDS-3001",
            Self::RemovalFailed { .. } => "MDS-3002",
            Self::Persistence { .. } => "MDS-4001",
            Self::Serialization { .. } => "MDS-4101",
            Self::Io { .. } => "MDS-4201",
        }
    }

    /// Error class of this failure.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidLevel { .. }
            | Self::InvalidConfig { .. }
            | Self::MissingConfig { .. }
            | Self::ConfigParse { .. } => ErrorCategory::Configuration,
            Self::Measurement { .. } => ErrorCategory::Measurement,
            Self::PathMissing { .. } | Self::RemovalFailed { .. } => ErrorCategory::Removal,
            Self::Persistence { .. } => ErrorCategory::Persistence,
            Self::Serialization { .. } | Self::Io { .. } => ErrorCategory::Internal,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for MdsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for MdsError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
