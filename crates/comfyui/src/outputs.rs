//! Output discovery for completed renders.
//!
//! Most workflows save under the file name template patched into the
//! graph, so the expected path is known up front and the worker simply
//! checks for the file. Kontext graphs name their own outputs, so the
//! file name has to be read back from the execution history.

use std::path::{Path, PathBuf};

use serde_json::Value;
use storyloom_core::types::PromptId;

/// Node that holds the saved image in the kontext graph.
pub const KONTEXT_OUTPUT_NODE: &str = "136";

/// Placeholder file name reported while a kontext render has no output
/// in its history yet. Never exists on disk, so existence checks fail
/// and the record stays in the retry path.
pub const KONTEXT_NOT_READY: &str = "kontext-not-ready.png";

/// Expected output path for a workflow saving under `filename`.
pub fn expected_output_path(output_dir: &Path, filename: &str) -> PathBuf {
    output_dir.join(filename)
}

/// Resolve a kontext render's output path from its execution history.
///
/// The history endpoint returns a map keyed by prompt id; the saved
/// image is `outputs.{node}.images[0].filename`, relative to ComfyUI's
/// own output directory. Any missing link in that chain resolves to
/// the [`KONTEXT_NOT_READY`] sentinel.
pub fn resolve_kontext_output(
    history: &Value,
    record_id: PromptId,
    comfy_output_dir: &Path,
) -> PathBuf {
    let filename = history
        .get(record_id.to_string())
        .and_then(|entry| entry.get("outputs"))
        .and_then(|outputs| outputs.get(KONTEXT_OUTPUT_NODE))
        .and_then(|node| node.get("images"))
        .and_then(|images| images.get(0))
        .and_then(|image| image.get("filename"))
        .and_then(|f| f.as_str());

    match filename {
        Some(name) => comfy_output_dir.join(name),
        None => comfy_output_dir.join(KONTEXT_NOT_READY),
    }
}
