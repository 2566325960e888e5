//! Core types and events

use crate::config::ImageSize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// File extension of every generated image
pub const IMAGE_EXTENSION: &str = "png";

/// One node of the input taxonomy
///
/// A node whose `children` list is absent, `null` or empty is a leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    /// Category name (surrounding whitespace is ignored)
    pub name: String,

    /// Child categories, in display order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Create a leaf node
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Create a node with children
    pub fn branch(name: impl Into<String>, children: Vec<CategoryNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// Whether this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CategoryNode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<CategoryNode>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Names from the taxonomy root down to one leaf, inclusive
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LeafPath(Vec<String>);

impl LeafPath {
    /// Build a path from root-to-leaf names
    ///
    /// Returns `None` for an empty sequence.
    pub fn new(names: Vec<String>) -> Option<Self> {
        if names.is_empty() {
            None
        } else {
            Some(Self(names))
        }
    }

    /// All names, root first
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// The leaf's own name
    pub fn leaf(&self) -> &str {
        // Never empty: enforced by `new`
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of names in the path
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Output file location relative to the output directory
    ///
    /// One path segment per name, with the image extension on the leaf segment.
    pub fn relative_path(&self) -> PathBuf {
        let (leaf, ancestors) = match self.0.split_last() {
            Some(split) => split,
            None => return PathBuf::new(),
        };
        let mut path: PathBuf = ancestors.iter().collect();
        // Appended rather than `set_extension` so names like "Mr. Happy" keep their dot
        path.push(format!("{leaf}.{IMAGE_EXTENSION}"));
        path
    }
}

impl fmt::Display for LeafPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A single image request, built per leaf and consumed immediately
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The leaf this image is for
    pub path: LeafPath,
    /// Text prompt
    pub prompt: String,
    /// Requested image size
    pub size: ImageSize,
    /// Model identifier
    pub model: String,
}

/// Terminal state of one leaf's pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Output already existed and overwriting was not requested
    Skipped,
    /// Prompt was logged; no request was made
    DryRun {
        /// The prompt that would have been sent
        prompt: String,
    },
    /// Image generated and written
    Done {
        /// Where the image was written
        path: PathBuf,
    },
    /// Generation or download failed
    Failed {
        /// Human-readable failure reason
        reason: String,
    },
}

/// Aggregate outcome counts for a whole run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of leaves dispatched
    pub total: usize,
    /// Images generated and written
    pub done: usize,
    /// Leaves skipped because the output existed
    pub skipped: usize,
    /// Leaves handled in dry-run mode
    pub dry_run: usize,
    /// Leaves that failed
    pub failed: usize,
}

impl RunSummary {
    /// Count one outcome
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.total += 1;
        match outcome {
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::DryRun { .. } => self.dry_run += 1,
            ItemOutcome::Done { .. } => self.done += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Severity attached to each [`Event`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Progress information
    Info,
    /// Recoverable problem (e.g. waiting after a rate limit)
    Warning,
    /// Leaf failed
    Error,
}

/// Per-leaf pipeline transitions, published to subscribers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Output exists, leaf skipped
    Skipped {
        /// The leaf
        path: LeafPath,
    },
    /// Prompt computed in dry-run mode
    DryRun {
        /// The leaf
        path: LeafPath,
        /// The prompt that would have been sent
        prompt: String,
    },
    /// A generation request is about to be sent
    Generating {
        /// The leaf
        path: LeafPath,
        /// 1-based attempt number
        attempt: u32,
    },
    /// Rate limited; waiting before the next attempt
    RateLimited {
        /// The leaf
        path: LeafPath,
        /// 1-based retry number about to be made
        retry: u32,
        /// How long the pipeline will sleep
        wait: Duration,
    },
    /// Image written
    Done {
        /// The leaf
        path: LeafPath,
        /// Where the image was written
        file: PathBuf,
    },
    /// Leaf failed
    Failed {
        /// The leaf
        path: LeafPath,
        /// Failure reason
        reason: String,
    },
}

impl Event {
    /// The severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::Skipped { .. }
            | Event::DryRun { .. }
            | Event::Generating { .. }
            | Event::Done { .. } => Severity::Info,
            Event::RateLimited { .. } => Severity::Warning,
            Event::Failed { .. } => Severity::Error,
        }
    }

    /// The leaf this event is about
    pub fn path(&self) -> &LeafPath {
        match self {
            Event::Skipped { path }
            | Event::DryRun { path, .. }
            | Event::Generating { path, .. }
            | Event::RateLimited { path, .. }
            | Event::Done { path, .. }
            | Event::Failed { path, .. } => path,
        }
    }
}
