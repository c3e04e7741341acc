//! Data model for fixture builds: source units, build targets, and target state.
//!
//! These types are plain values. Nothing here touches the filesystem; paths are
//! derived by [`crate::layout::FixtureLayout`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::layout::FixtureLayout;

/// Kind of a source file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `.s` / `.S`: assembled and linked directly.
    Assembly,
    /// `.c`: lowered to assembly first.
    C,
}

impl SourceKind {
    /// Classify a path by extension, or `None` for unrecognized files.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("s") | Some("S") => Some(SourceKind::Assembly),
            Some("c") => Some(SourceKind::C),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Assembly => "assembly",
            SourceKind::C => "c",
        }
    }
}

/// One input file. Identity is its path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self { path: path.into(), kind }
    }

    /// Build a unit from a path, classifying it by extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        SourceKind::from_path(&path).map(|kind| Self { path, kind })
    }
}

/// A source unit paired with the paths it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub source: SourceUnit,
    /// Final flat image path (`<stem>.bin`).
    pub output: PathBuf,
    /// Intermediate assembly path for C sources (`<stem>.s`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<PathBuf>,
}

impl BuildTarget {
    pub fn new(source: SourceUnit) -> Self {
        let output = FixtureLayout::image_path(&source.path);
        let intermediate = match source.kind {
            SourceKind::C => Some(FixtureLayout::intermediate_path(&source.path)),
            SourceKind::Assembly => None,
        };
        Self { source, output, intermediate }
    }

    /// The assembly unit that directly precedes the image.
    ///
    /// For assembly sources this is the source itself; for C sources it is the
    /// lowered intermediate.
    pub fn assembly_unit(&self) -> SourceUnit {
        match &self.intermediate {
            Some(asm) => SourceUnit::new(asm.clone(), SourceKind::Assembly),
            None => self.source.clone(),
        }
    }

    /// Short display name (file name of the source).
    pub fn name(&self) -> String {
        self.source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.path.display().to_string())
    }
}

/// Per-target lifecycle.
///
/// `Extracted` and `Failed` are terminal. Assembling and linking happen in a
/// single compiler-driver call, so an assembler error and a linker error both
/// fail before `Assembled` (the diagnostic text tells them apart). `Assembled`
/// means the driver exited cleanly; `Linked` means it left a container behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Pending,
    Lowered,
    Assembled,
    Linked,
    Extracted,
    Failed,
}

impl TargetState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetState::Extracted | TargetState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetState::Pending => "pending",
            TargetState::Lowered => "lowered",
            TargetState::Assembled => "assembled",
            TargetState::Linked => "linked",
            TargetState::Extracted => "extracted",
            TargetState::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_extensions() {
        assert_eq!(SourceKind::from_path(Path::new("t/addi.s")), Some(SourceKind::Assembly));
        assert_eq!(SourceKind::from_path(Path::new("t/boot.S")), Some(SourceKind::Assembly));
        assert_eq!(SourceKind::from_path(Path::new("t/fib.c")), Some(SourceKind::C));
        assert_eq!(SourceKind::from_path(Path::new("t/addi.bin")), None);
        assert_eq!(SourceKind::from_path(Path::new("t/Makefile")), None);
    }

    #[test]
    fn c_targets_route_through_an_intermediate() {
        let target = BuildTarget::new(SourceUnit::new("fx/fib.c", SourceKind::C));
        assert_eq!(target.output, PathBuf::from("fx/fib.bin"));
        assert_eq!(target.intermediate, Some(PathBuf::from("fx/fib.s")));
        let asm = target.assembly_unit();
        assert_eq!(asm.kind, SourceKind::Assembly);
        assert_eq!(asm.path, PathBuf::from("fx/fib.s"));
    }

    #[test]
    fn assembly_targets_are_their_own_predecessor() {
        let unit = SourceUnit::new("fx/add-addi.s", SourceKind::Assembly);
        let target = BuildTarget::new(unit.clone());
        assert_eq!(target.output, PathBuf::from("fx/add-addi.bin"));
        assert!(target.intermediate.is_none());
        assert_eq!(target.assembly_unit(), unit);
        assert_eq!(target.name(), "add-addi.s");
    }

    #[test]
    fn only_extracted_and_failed_are_terminal() {
        assert!(TargetState::Extracted.is_terminal());
        assert!(TargetState::Failed.is_terminal());
        assert!(!TargetState::Linked.is_terminal());
        assert!(!TargetState::Pending.is_terminal());
    }
}
