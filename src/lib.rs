//! # feeling-images
//!
//! Generate one portrait image for every leaf of a nested category taxonomy
//! (typically a feelings wheel) using an OpenAI-compatible image API.
//!
//! A run flattens the taxonomy into root-to-leaf name paths, builds a prompt for
//! each leaf, requests an image, and downloads it to
//! `<output_dir>/<name1>/.../<leaf>.png`. Existing files are skipped unless
//! [`Config::force`] is set, so an interrupted run can simply be restarted.
//!
//! ## Quick Start
//!
//! ```no_run
//! use feeling_images::{Config, taxonomy};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         output_dir: "images".into(),
//!         max_workers: 4,
//!         ..Default::default()
//!     };
//!
//!     let root = taxonomy::load(Path::new("Feelings.json")).await?;
//!     let api_key = feeling_images::config::api_key_from_env()?;
//!     let summary = feeling_images::run(config, &api_key, &root).await?;
//!     println!("{} generated, {} failed", summary.done, summary.failed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Work dispatcher with bounded parallelism
pub mod dispatcher;
/// Image download with retry
pub mod download;
/// Error types
pub mod error;
/// Image generation API client
pub mod generation;
/// Per-leaf generation pipeline
pub mod pipeline;
/// Prompt construction
pub mod prompt;
/// Retry logic with linear backoff
pub mod retry;
/// Taxonomy loading and flattening
pub mod taxonomy;
/// Core types and events
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, GenerationConfig, ImageSize, RetryConfig};
pub use dispatcher::Dispatcher;
pub use download::Downloader;
pub use error::{DownloadError, Error, GenerationError, Result};
pub use generation::{ImageGenerator, OpenAiImageClient};
pub use pipeline::LeafPipeline;
pub use types::{
    CategoryNode, Event, GenerationRequest, ItemOutcome, LeafPath, RunSummary, Severity,
};

/// Generate images for every leaf of `taxonomy` using the OpenAI image API
///
/// # Errors
///
/// Fails before any leaf is processed if the API key is empty, the configuration is
/// invalid, the taxonomy is malformed, or the output directory cannot be created.
/// Per-leaf failures are reported in the returned [`RunSummary`] instead.
pub async fn run(config: Config, api_key: &str, taxonomy: &CategoryNode) -> Result<RunSummary> {
    let generator = OpenAiImageClient::new(api_key, &config.generation)?;
    run_with_generator(config, Arc::new(generator), taxonomy).await
}

/// Like [`run`], with a caller-supplied [`ImageGenerator`]
pub async fn run_with_generator(
    config: Config,
    generator: Arc<dyn ImageGenerator>,
    taxonomy: &CategoryNode,
) -> Result<RunSummary> {
    config.validate()?;
    let leaves = taxonomy::flatten(taxonomy)?;

    tokio::fs::create_dir_all(&config.output_dir).await?;
    let downloader = Downloader::new(&config.download)?;
    let pipeline = LeafPipeline::new(generator, downloader, Arc::new(config));

    Ok(Dispatcher::from_pipeline(pipeline).run(leaves).await)
}
