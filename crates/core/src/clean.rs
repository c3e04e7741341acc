use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::discovery::{discover, DiscoveryOptions};
use crate::error::{BuildError, BuildResult};
use crate::layout::{FixtureLayout, IMAGE_EXTENSION};
use crate::model::SourceKind;

/// Remove generated files from a fixtures directory.
///
/// Deletes every `*.bin` directly inside `root` and the `.s` lowered from each
/// `.c`. Hand-written sources are never touched. Returns the removed paths,
/// sorted. A missing root is a no-op.
pub fn clean(root: &Path) -> BuildResult<Vec<PathBuf>> {
    let layout = FixtureLayout::new(root);
    if !layout.exists() {
        return Ok(Vec::new());
    }

    let mut doomed = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| BuildError::io(root, e))? {
        let entry = entry.map_err(|e| BuildError::io(root, e))?;
        let path = entry.path();
        let is_file = entry.file_type().map_err(|e| BuildError::io(&path, e))?.is_file();
        if is_file && path.extension().and_then(|e| e.to_str()) == Some(IMAGE_EXTENSION) {
            doomed.push(path);
        }
    }
    for unit in discover(root, &DiscoveryOptions { include_c: true })? {
        if unit.kind == SourceKind::C {
            let asm = FixtureLayout::intermediate_path(&unit.path);
            if asm.is_file() {
                doomed.push(asm);
            }
        }
    }

    doomed.sort();
    doomed.dedup();
    for path in &doomed {
        fs::remove_file(path).map_err(|e| BuildError::io(path, e))?;
        debug!(path = %path.display(), "removed generated file");
    }
    Ok(doomed)
}
