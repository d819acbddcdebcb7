//! SG-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, GaugeError>;

/// Top-level error type for storage_gauge.
///
/// Codes in the `SG-1xxx` range are configuration errors: they are surfaced
/// at startup and prevent the engine from being constructed. Everything else
/// is a runtime failure of a single measurement pass.
#[derive(Debug, Error)]
pub enum GaugeError {
    #[error("[SG-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SG-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SG-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SG-1004] unparsable size string: {input:?}")]
    SizeParse { input: String },

    #[error("[SG-1005] unknown category referenced: {name:?}")]
    UnknownCategory { name: String },

    #[error("[SG-2001] measurement failure for {path}: {details}")]
    Measurement { path: PathBuf, details: String },

    #[error("[SG-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SG-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SG-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },
}

impl GaugeError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SG-1001",
            Self::MissingConfig { .. } => "SG-1002",
            Self::ConfigParse { .. } => "SG-1003",
            Self::SizeParse { .. } => "SG-1004",
            Self::UnknownCategory { .. } => "SG-1005",
            Self::Measurement { .. } => "SG-2001",
            Self::Serialization { .. } => "SG-2101",
            Self::Io { .. } => "SG-3002",
            Self::ChannelClosed { .. } => "SG-3003",
        }
    }

    /// Whether this error belongs to the startup-fatal configuration family.
    ///
    /// Configuration errors mean no valid catalog/limit exists and no report
    /// can ever be produced; measurement-time errors affect one pass only.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::SizeParse { .. }
                | Self::UnknownCategory { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for measurement failures.
    #[must_use]
    pub fn measurement(path: impl AsRef<Path>, details: impl Into<String>) -> Self {
        Self::Measurement {
            path: path.as_ref().to_path_buf(),
            details: details.into(),
        }
    }
}

impl From<toml::de::Error> for GaugeError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for GaugeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}
