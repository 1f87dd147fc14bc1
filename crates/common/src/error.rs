//! Error types shared across Captioner crates.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for Captioner operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    /// Malformed segment or style input. Never retried.
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unknown caption style: {key}")]
    UnknownStyle { key: String },

    #[error("Caption style already registered: {key}")]
    DuplicateKey { key: String },

    /// A script run needs a font family the style does not provide.
    /// Recoverable: the compositor falls back and keeps going.
    #[error("No font family for {script} text (wanted {family})")]
    UnsupportedScript { script: String, family: String },

    /// Awaiting a render job exceeded its bound. The job stays live.
    #[error("Render job {job_id} still running after {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    #[error("Unknown render job: {job_id}")]
    UnknownJob { job_id: String },

    #[error("Encode backend error: {message}")]
    Backend { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CaptionError.
pub type CaptionResult<T> = Result<T, CaptionError>;

impl CaptionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn unknown_style(key: impl Into<String>) -> Self {
        Self::UnknownStyle { key: key.into() }
    }

    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether the caller may reasonably try again later.
    ///
    /// Only timeouts qualify; everything else is either a terminal input
    /// problem or a backend failure that needs a fresh submission.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
