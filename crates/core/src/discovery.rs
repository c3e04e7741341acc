//! Source discovery: enumerate fixture sources inside a fixtures directory.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BuildError, BuildResult};
use crate::layout::FixtureLayout;
use crate::model::{BuildTarget, SourceKind, SourceUnit};

/// Knobs for discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Report `.c` files (and suppress their generated `.s` siblings).
    pub include_c: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self { include_c: true }
    }
}

/// Return every recognized source directly inside `root`, sorted by path.
///
/// A missing root yields an empty set. When C is enabled, a `.s` file sharing
/// its stem with a `.c` file is the C file's lowered output and is skipped.
pub fn discover(root: &Path, options: &DiscoveryOptions) -> BuildResult<Vec<SourceUnit>> {
    let layout = FixtureLayout::new(root);
    if !layout.exists() {
        debug!(root = %root.display(), "fixtures directory absent; nothing to discover");
        return Ok(Vec::new());
    }

    let mut found: BTreeSet<SourceUnit> = BTreeSet::new();
    for entry in fs::read_dir(root).map_err(|e| BuildError::io(root, e))? {
        let entry = entry.map_err(|e| BuildError::io(root, e))?;
        let file_type = entry.file_type().map_err(|e| BuildError::io(entry.path(), e))?;
        // Hidden files include our own staging files.
        if !file_type.is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let Some(unit) = SourceUnit::from_path(entry.path()) else {
            continue;
        };
        if unit.kind == SourceKind::C && !options.include_c {
            continue;
        }
        found.insert(unit);
    }

    let c_stems: BTreeSet<PathBuf> = found
        .iter()
        .filter(|u| u.kind == SourceKind::C)
        .map(|u| u.path.with_extension(""))
        .collect();

    let units: Vec<SourceUnit> = found
        .into_iter()
        .filter(|u| {
            let derived = u.kind == SourceKind::Assembly
                && u.path.extension().and_then(|e| e.to_str()) == Some("s")
                && c_stems.contains(&u.path.with_extension(""));
            if derived {
                debug!(path = %u.path.display(), "skipping assembly lowered from a C source");
            }
            !derived
        })
        .collect();

    debug!(root = %root.display(), count = units.len(), "discovered fixture sources");
    Ok(units)
}

/// Discover sources and pair each with its output paths.
pub fn discover_targets(root: &Path, options: &DiscoveryOptions) -> BuildResult<Vec<BuildTarget>> {
    Ok(discover(root, options)?.into_iter().map(BuildTarget::new).collect())
}
