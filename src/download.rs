//! Image download with bounded retry
//!
//! Transport failures (timeouts, connection errors, non-2xx statuses, truncated
//! bodies) are retried with a linear backoff. Failing to write the file locally is
//! not a transport problem and ends the download immediately.

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result};
use crate::retry::{IsRetryable, LinearBackoff, retry_with_backoff};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Failure of a single download attempt
#[derive(Debug)]
enum AttemptError {
    Transport(String),
    Write(DownloadError),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transport(msg) => f.write_str(msg),
            AttemptError::Write(e) => write!(f, "{e}"),
        }
    }
}

impl IsRetryable for AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Transport(_))
    }
}

/// Downloads generated images to disk
#[derive(Clone, Debug)]
pub struct Downloader {
    http_client: reqwest::Client,
    policy: LinearBackoff,
}

impl Downloader {
    /// Create a downloader from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self::with_client(
            http_client,
            LinearBackoff::from_attempts(config.attempts, config.backoff),
        ))
    }

    /// Create a downloader around an existing HTTP client
    pub fn with_client(http_client: reqwest::Client, policy: LinearBackoff) -> Self {
        Self {
            http_client,
            policy,
        }
    }

    /// The retry policy in use
    pub fn policy(&self) -> &LinearBackoff {
        &self.policy
    }

    /// Fetch `url` and write the response body to `dest`
    ///
    /// Parent directories are created as needed. The body is written to a temporary
    /// sibling file and renamed into place, so `dest` only ever holds a complete
    /// image. Returns the number of bytes written.
    ///
    /// # Errors
    /// - [`DownloadError::Exhausted`] when every attempt failed at the transport level
    /// - [`DownloadError::Write`] when the file could not be written
    pub async fn download(&self, url: &str, dest: &Path) -> std::result::Result<u64, DownloadError> {
        let attempts = self.policy.max_attempts();

        let result = retry_with_backoff(
            &self.policy,
            |retry, delay, err: &AttemptError| {
                warn!(
                    url = %url,
                    attempt = retry,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "download failed, retrying"
                );
            },
            |attempt| async move {
                debug!(url = %url, attempt, max_attempts = attempts, "attempting download");
                let bytes = self.fetch(url).await.map_err(AttemptError::Transport)?;
                write_atomically(dest, &bytes)
                    .await
                    .map_err(AttemptError::Write)?;
                Ok(bytes.len() as u64)
            },
        )
        .await;

        match result {
            Ok(written) => {
                debug!(dest = %dest.display(), bytes = written, "download succeeded");
                Ok(written)
            }
            Err(AttemptError::Transport(last)) => {
                error!(url = %url, attempts, error = %last, "giving up on download");
                Err(DownloadError::Exhausted {
                    url: url.to_string(),
                    attempts,
                    last,
                })
            }
            Err(AttemptError::Write(e)) => {
                error!(dest = %dest.display(), error = %e, "failed to write image");
                Err(e)
            }
        }
    }

    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                format!("timeout fetching {url}")
            } else if e.is_connect() {
                format!("connection failed for {url}: {e}")
            } else {
                format!("failed to fetch {url}: {e}")
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status} fetching {url}"));
        }

        response
            .bytes()
            .await
            .map(|body| body.to_vec())
            .map_err(|e| format!("failed to read response body from {url}: {e}"))
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.part"))
}

async fn write_atomically(dest: &Path, bytes: &[u8]) -> std::result::Result<(), DownloadError> {
    let write_err = |source| DownloadError::Write {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let partial = partial_path(dest);
    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        tokio::fs::remove_file(&partial).await.ok();
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&partial, dest).await {
        tokio::fs::remove_file(&partial).await.ok();
        return Err(write_err(e));
    }
    Ok(())
}
