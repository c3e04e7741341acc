use std::path::{Path, PathBuf};

/// Extension of generated flat images.
pub const IMAGE_EXTENSION: &str = "bin";

/// Extension of assembly lowered from C sources.
pub const INTERMEDIATE_EXTENSION: &str = "s";

/// Logical layout of a fixtures directory on disk.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
#[derive(Debug, Clone)]
pub struct FixtureLayout {
    /// Directory holding hand-authored sources and their generated siblings.
    pub root: PathBuf,
}

impl FixtureLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Sibling flat image path for a source: same stem, `.bin`.
    pub fn image_path(source: &Path) -> PathBuf {
        source.with_extension(IMAGE_EXTENSION)
    }

    /// Sibling assembly path a C source lowers into: same stem, `.s`.
    pub fn intermediate_path(source: &Path) -> PathBuf {
        source.with_extension(INTERMEDIATE_EXTENSION)
    }

    /// Image path for a fixture referenced by stem, e.g. `add-addi`.
    pub fn image_for_stem(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.{IMAGE_EXTENSION}"))
    }

    /// True when the root exists and is a directory.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }
}
