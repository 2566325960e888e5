//! Error types for feeling-images
//!
//! Errors fall into two groups:
//! - Run-level errors ([`Error::Config`], [`Error::InvalidTaxonomy`], I/O and parse
//!   failures while loading input) abort the whole run before any leaf is processed.
//! - Leaf-level errors ([`GenerationError`], [`DownloadError`]) are scoped to a single
//!   leaf. The pipeline converts them into a failed outcome and the run continues.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for feeling-images operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for feeling-images
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key or environment variable that caused the error
        key: Option<String>,
    },

    /// The taxonomy document is structurally invalid
    #[error("invalid taxonomy: {0}")]
    InvalidTaxonomy(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (invalid JSON input)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction or transport error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Image generation failed
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Image download failed
    #[error("download error: {0}")]
    Download(#[from] DownloadError),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Classified failure of a single image generation request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The request was rejected (malformed, content policy violation). Never retried.
    #[error("permanent failure: {message}")]
    Permanent {
        /// Message reported by the API
        message: String,
    },

    /// Quota or throughput limit exceeded. Retried after backoff.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Message reported by the API
        message: String,
    },

    /// Connectivity problem or server-side error
    #[error("API error: {message}")]
    Transient {
        /// Description of the transport failure or HTTP status
        message: String,
    },
}

/// Image download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// All download attempts failed at the transport level
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        /// The URL being downloaded
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// The last transport failure
        last: String,
    },

    /// The response body could not be written to disk
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}
