//! Artifact serialization.
//!
//! Writes the graph artifact as pretty-printed UTF-8 JSON. The document is
//! written to a temporary sibling file and renamed into place, so an
//! interrupted run never leaves a partially-written `chat_data.json`.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::graph::GraphArtifact;

/// File name of the artifact inside the output directory.
pub const ARTIFACT_FILE: &str = "chat_data.json";

/// Serialize the artifact to `<output_dir>/chat_data.json` atomically and
/// return the final path.
pub fn write_artifact(artifact: &GraphArtifact, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let json = serde_json::to_string_pretty(artifact)?;

    let final_path = output_dir.join(ARTIFACT_FILE);
    let tmp_path = output_dir.join(format!("{}.tmp", ARTIFACT_FILE));

    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, &final_path)?;

    Ok(final_path)
}
