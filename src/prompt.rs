//! Prompt construction for a single leaf

use crate::types::LeafPath;

/// Separator between the feeling names interpolated into the prompt
pub const FEELING_SEPARATOR: &str = ", ";

/// The trailing names of `path` that describe the feeling
///
/// `root_levels` is how many ancestors to include besides the leaf; a negative value
/// selects the whole path.
pub fn feeling_names(path: &LeafPath, root_levels: i32) -> &[String] {
    let names = path.names();
    match usize::try_from(root_levels) {
        Ok(levels) => {
            let keep = levels.saturating_add(1).min(names.len());
            &names[names.len() - keep..]
        }
        Err(_) => names,
    }
}

/// Compose the text prompt sent to the image API
pub fn build_prompt(path: &LeafPath, style: &str, root_levels: i32) -> String {
    let feeling_line = feeling_names(path, root_levels).join(FEELING_SEPARATOR);
    format!(
        "A vertical portrait photograph of a single human subject centered in the frame, \
         displaying a clearly recognizable expression of '{feeling_line}'. \
         The emotional state must be immediately clear to viewers through facial expression \
         and body language; {style}. No text or lettering should appear in the image."
    )
}
