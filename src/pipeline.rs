//! Per-leaf pipeline: prompt → generate → download → persist
//!
//! Each leaf moves through a small state machine:
//!
//! ```text
//! start ─┬─ dry run ──────────────────────────────▶ DryRun
//!        ├─ output exists, no force ──────────────▶ Skipped
//!        └─ Generating ─┬─ url ─▶ Downloading ─┬─▶ Done
//!             ▲         │                      └─▶ Failed
//!             │         ├─ rate limited, retries left: wait n·backoff
//!             └─────────┘
//!                       └─ rate limited (exhausted) / permanent / transient ─▶ Failed
//! ```
//!
//! Errors never escape [`LeafPipeline::process`]: every failure becomes
//! [`ItemOutcome::Failed`] so sibling leaves are unaffected.

use crate::config::Config;
use crate::download::Downloader;
use crate::error::GenerationError;
use crate::generation::ImageGenerator;
use crate::prompt::build_prompt;
use crate::retry::{LinearBackoff, retry_with_backoff};
use crate::types::{Event, GenerationRequest, ItemOutcome, LeafPath};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Runs the generation pipeline for individual leaves
///
/// Cheap to clone; clones share the generator, HTTP client and event channel.
#[derive(Clone)]
pub struct LeafPipeline {
    generator: Arc<dyn ImageGenerator>,
    downloader: Downloader,
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
}

impl LeafPipeline {
    /// Create a pipeline with its own event channel
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        downloader: Downloader,
        config: Arc<Config>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self::with_events(generator, downloader, config, event_tx)
    }

    /// Create a pipeline that publishes to an existing event channel
    pub fn with_events(
        generator: Arc<dyn ImageGenerator>,
        downloader: Downloader,
        config: Arc<Config>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            generator,
            downloader,
            config,
            event_tx,
        }
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Run configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Where the image for `path` is written
    pub fn output_path(&self, path: &LeafPath) -> PathBuf {
        self.config.output_dir.join(path.relative_path())
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    fn fail(&self, path: &LeafPath, reason: String) -> ItemOutcome {
        error!(leaf = %path, error = %reason, "[err]");
        self.emit(Event::Failed {
            path: path.clone(),
            reason: reason.clone(),
        });
        ItemOutcome::Failed { reason }
    }

    /// Process one leaf to a terminal outcome
    pub async fn process(&self, path: &LeafPath) -> ItemOutcome {
        let generation = &self.config.generation;
        let prompt = build_prompt(path, &generation.style, generation.root_node_levels);
        let outfile = self.output_path(path);

        if let Some(parent) = outfile.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return self.fail(
                path,
                format!("failed to create directory {}: {e}", parent.display()),
            );
        }

        if self.config.dry_run {
            info!(leaf = %path, prompt = %prompt, "[dry-run]");
            self.emit(Event::DryRun {
                path: path.clone(),
                prompt: prompt.clone(),
            });
            return ItemOutcome::DryRun { prompt };
        }

        if !self.config.force {
            match tokio::fs::try_exists(&outfile).await {
                Ok(true) => {
                    info!(leaf = %path, "[skip]");
                    self.emit(Event::Skipped { path: path.clone() });
                    return ItemOutcome::Skipped;
                }
                Ok(false) => {}
                Err(e) => {
                    return self.fail(
                        path,
                        format!("failed to check {}: {e}", outfile.display()),
                    );
                }
            }
        }

        let request = GenerationRequest {
            path: path.clone(),
            prompt,
            size: generation.size,
            model: generation.model.clone(),
        };

        let url = match self.generate(&request).await {
            Ok(url) => url,
            Err(e) => return self.fail(path, e),
        };

        match self.downloader.download(&url, &outfile).await {
            Ok(_) => {
                info!(leaf = %path, file = %outfile.display(), "[ok]");
                self.emit(Event::Done {
                    path: path.clone(),
                    file: outfile.clone(),
                });
                ItemOutcome::Done { path: outfile }
            }
            Err(e) => self.fail(path, e.to_string()),
        }
    }

    /// Generate with rate-limit retries; returns the image URL or a failure reason
    async fn generate(&self, request: &GenerationRequest) -> Result<String, String> {
        let policy = LinearBackoff::new(self.config.retry.max_retries, self.config.retry.backoff);
        let path = &request.path;

        let result = retry_with_backoff(
            &policy,
            |retry, wait, _: &GenerationError| {
                warn!(
                    leaf = %path,
                    retry,
                    wait_secs = wait.as_secs_f64(),
                    "[rate-limit] retrying in {:.1}s",
                    wait.as_secs_f64()
                );
                self.emit(Event::RateLimited {
                    path: path.clone(),
                    retry,
                    wait,
                });
            },
            |attempt| {
                self.emit(Event::Generating {
                    path: path.clone(),
                    attempt,
                });
                self.generator.generate(request)
            },
        )
        .await;

        result.map_err(|e| match e {
            GenerationError::RateLimited { message } => format!(
                "still rate limited after {} attempts: {message}",
                policy.max_attempts()
            ),
            other => other.to_string(),
        })
    }
}
