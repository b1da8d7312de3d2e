//! Error types for svedb.
//!
//! Library crates use [`SvedbError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all svedb operations.
#[derive(Debug, thiserror::Error)]
pub enum SvedbError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error that is not retried (body reads, client setup).
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A catalog page could not be processed; the rest of the segment is abandoned.
    #[error("segment {segment} page {page}: {message}")]
    PageFailed {
        segment: String,
        page: u32,
        message: String,
    },

    /// None of the requested segments is in the supported registry.
    #[error("unsupported segment: no supported segment in '{requested}'")]
    UnsupportedSegment { requested: String },

    /// Object store listing or upload error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SvedbError>;

impl SvedbError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
