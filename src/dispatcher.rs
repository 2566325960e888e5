//! Work dispatcher — runs the leaf pipeline over every leaf with bounded parallelism.

use crate::pipeline::LeafPipeline;
use crate::types::{ItemOutcome, LeafPath, RunSummary};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};

/// Runs [`LeafPipeline::process`] for a list of leaves
///
/// At most `concurrency` leaves are in flight at once. Permits are taken in list
/// order before each leaf's task is spawned, so a concurrency of 1 processes leaves
/// strictly one after another in list order.
pub struct Dispatcher {
    pipeline: LeafPipeline,
    concurrency: usize,
}

impl Dispatcher {
    /// Create a dispatcher; a concurrency of 0 is treated as 1
    pub fn new(pipeline: LeafPipeline, concurrency: usize) -> Self {
        Self {
            pipeline,
            concurrency: concurrency.max(1),
        }
    }

    /// Create a dispatcher using the pipeline's configured worker count
    pub fn from_pipeline(pipeline: LeafPipeline) -> Self {
        let concurrency = pipeline.config().concurrency();
        Self::new(pipeline, concurrency)
    }

    /// Maximum number of leaves processed at once
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process every leaf and wait for all of them to finish
    ///
    /// Per-leaf failures are counted, never propagated. A leaf task that panics is
    /// logged and counted as failed; its siblings keep running.
    pub async fn run(&self, leaves: Vec<LeafPath>) -> RunSummary {
        info!(
            leaves = leaves.len(),
            workers = self.concurrency,
            "found {} leaf feelings",
            leaves.len()
        );

        let limit = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut summary = RunSummary::default();

        for path in leaves {
            // The semaphore is never closed
            let Ok(permit) = limit.clone().acquire_owned().await else {
                error!("worker pool closed unexpectedly");
                break;
            };

            let pipeline = self.pipeline.clone();
            tasks.spawn(async move {
                let _permit = permit;
                pipeline.process(&path).await
            });

            while let Some(result) = tasks.try_join_next() {
                record(&mut summary, result);
            }
        }

        while let Some(result) = tasks.join_next().await {
            record(&mut summary, result);
        }

        info!(
            total = summary.total,
            done = summary.done,
            skipped = summary.skipped,
            dry_run = summary.dry_run,
            failed = summary.failed,
            "Done."
        );
        summary
    }
}

fn record(summary: &mut RunSummary, result: Result<ItemOutcome, JoinError>) {
    match result {
        Ok(outcome) => summary.record(&outcome),
        Err(e) => {
            error!(error = %e, "leaf task panicked");
            summary.record(&ItemOutcome::Failed {
                reason: format!("task failed: {e}"),
            });
        }
    }
}
