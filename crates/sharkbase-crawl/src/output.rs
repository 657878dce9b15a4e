//! Writing the classification file
//!
//! Downstream tools read this file, so the format is fixed: pretty JSON with
//! 4-space indentation and accented names written as UTF-8 rather than `\u`
//! escapes.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use sharkbase_common::Result;
use std::path::Path;
use tracing::info;

use crate::tree::ClassificationTree;

/// Render the tree exactly as it is written to disk
pub fn to_json_bytes(tree: &ClassificationTree) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    tree.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Write the tree to `path`, creating parent directories.
///
/// The file is written next to its destination and renamed into place, so
/// readers never see a half-written classification.
pub fn write_tree(tree: &ClassificationTree, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let bytes = to_json_bytes(tree)?;
    let staging = path.with_extension("json.partial");
    std::fs::write(&staging, &bytes)?;
    if let Err(err) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(err.into());
    }

    info!(
        path = %path.display(),
        families = tree.family_count(),
        species = tree.species_count(),
        bytes = bytes.len(),
        "Wrote classification"
    );
    Ok(())
}
