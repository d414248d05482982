//! Error types for sqlspot.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for scanning and configuration.
///
/// Detection and rendering never surface through this type: a candidate
/// that is not SQL, or a rewrite that cannot be applied safely, is absorbed
/// where it happens. See [`crate::query::Detection`] and
/// [`crate::render::RenderError`].
#[derive(Debug, Error)]
pub enum SqlSpotError {
    /// Reading or writing a file failed.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration file or value is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host file could not be parsed in its own language.
    #[error("{path}: {language} syntax error: {message}")]
    HostSyntax {
        path: PathBuf,
        language: &'static str,
        message: String,
    },

    /// The file type has no host adapter for the requested operation.
    #[error("{operation} is not supported for {path}")]
    Unsupported {
        operation: &'static str,
        path: PathBuf,
    },
}

impl SqlSpotError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a host syntax error.
    pub fn host_syntax(
        path: impl Into<PathBuf>,
        language: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::HostSyntax {
            path: path.into(),
            language,
            message: message.into(),
        }
    }
}

/// Result type alias for sqlspot operations.
pub type SqlSpotResult<T> = Result<T, SqlSpotError>;
