//! Taxonomy fixtures and configuration builders

use feeling_images::{CategoryNode, Config, GenerationConfig};
use std::path::Path;
use std::time::Duration;

/// API key sent by every test client
pub const TEST_API_KEY: &str = "sk-test-key";

/// The two-leaf example used throughout the docs
pub const JOY_JSON: &str = r#"{
  "name": "Joy",
  "children": [
    { "name": "Cheerful" },
    { "name": "Content", "children": [] }
  ]
}"#;

/// A wider tree rooted at a synthetic "Feelings" node
pub const FEELINGS_JSON: &str = r#"{
  "name": "Feelings",
  "children": [
    { "name": "Joy", "children": [
      { "name": "Cheerful" },
      { "name": "Proud", "children": null }
    ]},
    { "name": "Sad", "children": [
      { "name": "Lonely" },
      { "name": "Hurt" }
    ]},
    { "name": "Fear", "children": [
      { "name": "Scared", "children": [
        { "name": "Helpless" },
        { "name": "Frightened" }
      ]}
    ]}
  ]
}"#;

/// Relative image paths of every leaf in [`FEELINGS_JSON`], in traversal order
pub const FEELINGS_IMAGES: &[&str] = &[
    "Feelings/Joy/Cheerful.png",
    "Feelings/Joy/Proud.png",
    "Feelings/Sad/Lonely.png",
    "Feelings/Sad/Hurt.png",
    "Feelings/Fear/Scared/Helpless.png",
    "Feelings/Fear/Scared/Frightened.png",
];

pub fn parse_taxonomy(json: &str) -> CategoryNode {
    serde_json::from_str(json).unwrap()
}

/// Config pointing at `api_base`, writing under `output_dir`, with millisecond backoffs
pub fn test_config(api_base: &str, output_dir: &Path) -> Config {
    let mut config = Config {
        output_dir: output_dir.to_path_buf(),
        generation: GenerationConfig {
            api_base: api_base.to_string(),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        ..Default::default()
    };
    config.retry.backoff = Duration::from_millis(10);
    config.download.backoff = Duration::from_millis(10);
    config.download.timeout = Duration::from_secs(5);
    config
}

/// Every `.png` under `dir`, relative to it, sorted
pub fn png_files(dir: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if path.extension().is_some_and(|ext| ext == "png") {
                let relative = path.strip_prefix(root).unwrap();
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
