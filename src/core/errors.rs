//! CW-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, CwError>;

/// Top-level error type for connwatch.
#[derive(Debug, Error)]
pub enum CwError {
    #[error("[CW-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CW-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CW-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CW-2001] {source_name} collection failed: {details}")]
    Collection {
        source_name: &'static str,
        details: String,
    },

    #[error("[CW-2002] {source_name} timed out after {after_ms}ms")]
    Timeout {
        source_name: &'static str,
        after_ms: u64,
    },

    #[error("[CW-2003] {source_name} request cancelled")]
    Cancelled { source_name: &'static str },

    #[error("[CW-2004] permission denied: {details}")]
    PermissionDenied { details: String },

    #[error("[CW-2005] docker daemon unavailable: {details}")]
    DockerUnavailable { details: String },

    #[error("[CW-2006] reverse lookup failed for {ip}: {details}")]
    Dns { ip: String, details: String },

    #[error("[CW-2007] signal {signal} to {target} failed: {details}")]
    Signal {
        target: String,
        signal: String,
        details: String,
    },

    #[error("[CW-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CW-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[CW-3002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[CW-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl CwError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CW-1001",
            Self::MissingConfig { .. } => "CW-1002",
            Self::ConfigParse { .. } => "CW-1003",
            Self::Collection { .. } => "CW-2001",
            Self::Timeout { .. } => "CW-2002",
            Self::Cancelled { .. } => "CW-2003",
            Self::PermissionDenied { .. } => "CW-2004",
            Self::DockerUnavailable { .. } => "CW-2005",
            Self::Dns { .. } => "CW-2006",
            Self::Signal { .. } => "CW-2007",
            Self::Serialization { .. } => "CW-2101",
            Self::Io { .. } => "CW-3001",
            Self::ChannelClosed { .. } => "CW-3002",
            Self::Runtime { .. } => "CW-3900",
        }
    }

    /// Whether retrying on a later tick might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Collection { .. }
                | Self::Timeout { .. }
                | Self::DockerUnavailable { .. }
                | Self::Dns { .. }
                | Self::Io { .. }
                | Self::Runtime { .. }
        )
    }

    /// Whether the request was cancelled by its caller.
    ///
    /// Cancellation is the one failure the enrichment wrappers never swallow.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
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

impl From<serde_json::Error> for CwError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for CwError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
