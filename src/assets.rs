//! Static viewer assets.
//!
//! The graph-viewer document is compiled into the binary and written into
//! the output directory next to the artifact, so the directory is fully
//! self-contained and can be served by anything.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// File name of the viewer document inside the output directory.
pub const VIEWER_FILE: &str = "relationship_graph.html";

const VIEWER_HTML: &str = include_str!("../templates/relationship_graph.html");

/// Write the viewer document into `output_dir`, returning its path.
pub fn install_viewer(output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(VIEWER_FILE);
    std::fs::write(&path, VIEWER_HTML)?;
    Ok(path)
}
