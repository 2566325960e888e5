//! Taxonomy loading and leaf flattening
//!
//! The input document is a single [`CategoryNode`] tree. [`flatten`] turns it into
//! the ordered list of [`LeafPath`]s the dispatcher works through: depth-first,
//! left-to-right, children in document order.

use crate::error::{Error, Result};
use crate::types::{CategoryNode, LeafPath};
use std::path::Path;
use tracing::debug;

/// Nesting limit for [`flatten`]
pub const MAX_DEPTH: usize = 256;

/// Read and parse a taxonomy JSON document
pub async fn load(path: &Path) -> Result<CategoryNode> {
    let content = tokio::fs::read(path).await?;
    let root: CategoryNode = serde_json::from_slice(&content)?;
    debug!(path = %path.display(), root = %root.name.trim(), "taxonomy loaded");
    Ok(root)
}

/// Return the root-to-leaf name path of every leaf, in depth-first order
///
/// Names are trimmed. A node with an empty (after trimming) name, or nesting deeper
/// than [`MAX_DEPTH`], makes the whole document invalid.
pub fn flatten(root: &CategoryNode) -> Result<Vec<LeafPath>> {
    let mut leaves = Vec::new();
    let mut ancestors = Vec::new();
    collect(root, &mut ancestors, &mut leaves)?;
    Ok(leaves)
}

fn collect(
    node: &CategoryNode,
    ancestors: &mut Vec<String>,
    leaves: &mut Vec<LeafPath>,
) -> Result<()> {
    if ancestors.len() >= MAX_DEPTH {
        return Err(Error::InvalidTaxonomy(format!(
            "nesting deeper than {MAX_DEPTH} levels under '{}'",
            ancestors.join("/")
        )));
    }

    let name = node.name.trim();
    if name.is_empty() {
        let location = if ancestors.is_empty() {
            "root".to_string()
        } else {
            format!("under '{}'", ancestors.join("/"))
        };
        return Err(Error::InvalidTaxonomy(format!(
            "category with empty name ({location})"
        )));
    }

    ancestors.push(name.to_string());
    if node.is_leaf() {
        if let Some(path) = LeafPath::new(ancestors.clone()) {
            leaves.push(path);
        }
    } else {
        for child in &node.children {
            collect(child, ancestors, leaves)?;
        }
    }
    ancestors.pop();
    Ok(())
}
