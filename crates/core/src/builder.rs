//! Image builder: source unit → (lowered assembly) → container → flat image.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::{BuildError, BuildResult};
use crate::image::{container_magic, is_elf_container, ImageArtifact};
use crate::model::{BuildTarget, SourceKind, TargetState};
use crate::toolchain::Toolchain;

/// Why a target ended in [`TargetState::Failed`] (or never started).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFailure {
    /// Last state reached before the failure.
    pub reached: TargetState,
    pub message: String,
    /// The failure makes every other target pointless (missing tool).
    pub fatal: bool,
}

/// Result of driving one target to a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: BuildTarget,
    pub state: TargetState,
    /// The image was already newer than its sources and was left alone.
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ImageArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TargetFailure>,
}

impl TargetOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == TargetState::Extracted
    }

    /// Outcome for a target that could not be attempted at all.
    pub fn refused(target: &BuildTarget, error: &BuildError) -> Self {
        Self {
            target: target.clone(),
            state: TargetState::Failed,
            skipped: false,
            artifact: None,
            failure: Some(TargetFailure {
                reached: TargetState::Pending,
                message: error.to_string(),
                fatal: error.is_fatal(),
            }),
        }
    }

    /// Outcome for a target the runner declined to start.
    pub fn not_started(target: &BuildTarget, reason: impl Into<String>) -> Self {
        Self {
            target: target.clone(),
            state: TargetState::Pending,
            skipped: false,
            artifact: None,
            failure: Some(TargetFailure {
                reached: TargetState::Pending,
                message: reason.into(),
                fatal: false,
            }),
        }
    }
}

/// Drives build targets through the toolchain.
///
/// Holds no mutable state; one builder can serve many threads.
#[derive(Debug)]
pub struct ImageBuilder<'a> {
    toolchain: &'a Toolchain,
    link: LinkConfig,
    force: bool,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(toolchain: &'a Toolchain, link: LinkConfig) -> Self {
        Self { toolchain, link, force: false }
    }

    /// Rebuild even when the image is already up to date.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn link(&self) -> &LinkConfig {
        &self.link
    }

    /// Build one target, recording how far it got.
    pub fn build(&self, target: &BuildTarget) -> TargetOutcome {
        if !self.force && is_up_to_date(target) {
            match ImageArtifact::from_file(&target.output) {
                Ok(artifact) => {
                    debug!(target = %target.name(), "image up to date; skipping");
                    return TargetOutcome {
                        target: target.clone(),
                        state: TargetState::Extracted,
                        skipped: true,
                        artifact: Some(artifact),
                        failure: None,
                    };
                }
                Err(e) => {
                    warn!(target = %target.name(), error = %e, "cannot reuse image; rebuilding")
                }
            }
        }

        let mut state = TargetState::Pending;
        match self.build_stages(target, &mut state) {
            Ok(artifact) => {
                info!(
                    target = %target.name(),
                    output = %artifact.path.display(),
                    len = artifact.len,
                    "built flat image"
                );
                TargetOutcome {
                    target: target.clone(),
                    state: TargetState::Extracted,
                    skipped: false,
                    artifact: Some(artifact),
                    failure: None,
                }
            }
            Err(e) => {
                warn!(target = %target.name(), stage = state.as_str(), error = %e, "build failed");
                TargetOutcome {
                    target: target.clone(),
                    state: TargetState::Failed,
                    skipped: false,
                    artifact: None,
                    failure: Some(TargetFailure {
                        reached: state,
                        message: e.to_string(),
                        fatal: e.is_fatal(),
                    }),
                }
            }
        }
    }

    /// Build one target unconditionally, returning the error rather than an
    /// outcome record.
    pub fn try_build(&self, target: &BuildTarget) -> BuildResult<ImageArtifact> {
        let mut state = TargetState::Pending;
        self.build_stages(target, &mut state)
    }

    fn build_stages(
        &self,
        target: &BuildTarget,
        state: &mut TargetState,
    ) -> BuildResult<ImageArtifact> {
        // A failed rebuild must not leave the previous image looking current.
        remove_if_exists(&target.output)?;

        let asm = target.assembly_unit();
        if target.source.kind == SourceKind::C {
            self.lower(target, &asm.path)?;
            *state = TargetState::Lowered;
        }

        let scratch = tempfile::Builder::new()
            .prefix("flatbin-")
            .tempdir()
            .map_err(|e| BuildError::io(std::env::temp_dir(), e))?;
        let container = scratch.path().join(container_name(&asm.path));

        debug!(source = %asm.path.display(), container = %container.display(), "assembling");
        self.toolchain.compiler.assemble_and_link(&asm.path, &container, &self.link)?;
        *state = TargetState::Assembled;

        if !container.is_file() {
            return Err(BuildError::SourceRejected {
                path: asm.path.clone(),
                tool: self.toolchain.compiler.name().to_string(),
                diagnostic: "compiler reported success but produced no output".into(),
            });
        }
        *state = TargetState::Linked;

        let bytes = self.toolchain.extractor.extract(&container)?;
        if is_elf_container(&bytes) {
            return Err(BuildError::ExtractionFailed {
                path: container,
                reason: "extracted image still starts with an ELF header".into(),
            });
        }
        if let Some(format) = container_magic(&bytes) {
            warn!(target = %target.name(), format, "image begins with a container-like magic");
        }

        write_atomically(&target.output, &bytes)?;
        *state = TargetState::Extracted;
        Ok(ImageArtifact::from_bytes(&target.output, &bytes))
    }

    /// Lower a C source to its sibling `.s`, replacing it only on success.
    fn lower(&self, target: &BuildTarget, asm_path: &Path) -> BuildResult<()> {
        remove_if_exists(asm_path)?;
        let dir = parent_dir(asm_path);
        let staged = tempfile::Builder::new()
            .prefix(".flatbin-")
            .suffix(".s")
            .tempfile_in(dir)
            .map_err(|e| BuildError::io(dir, e))?;

        debug!(source = %target.source.path.display(), output = %asm_path.display(), "lowering C");
        self.toolchain.compiler.lower_to_assembly(&target.source.path, staged.path())?;
        staged.persist(asm_path).map_err(|e| BuildError::io(asm_path, e.error))?;
        Ok(())
    }
}

/// The image exists and is at least as new as every input.
pub fn is_up_to_date(target: &BuildTarget) -> bool {
    let Some(output) = modified(&target.output) else {
        return false;
    };
    let mut inputs = vec![target.source.path.as_path()];
    if let Some(asm) = &target.intermediate {
        if !asm.is_file() {
            return false;
        }
        inputs.push(asm.as_path());
    }
    inputs.iter().all(|input| modified(input).is_some_and(|m| m <= output))
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn container_name(asm: &Path) -> String {
    let stem = asm.file_stem().map(|s| s.to_string_lossy().to_string());
    format!("{}.elf", stem.unwrap_or_else(|| "image".to_string()))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

pub(crate) fn remove_if_exists(path: &Path) -> BuildResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(path, e)),
    }
}

/// Write `bytes` next to `path` and rename into place, so readers only ever see
/// a complete image or none.
fn write_atomically(path: &Path, bytes: &[u8]) -> BuildResult<()> {
    let dir = parent_dir(path);
    let mut staged = tempfile::Builder::new()
        .prefix(".flatbin-")
        .suffix(".bin")
        .tempfile_in(dir)
        .map_err(|e| BuildError::io(dir, e))?;
    staged.write_all(bytes).map_err(|e| BuildError::io(staged.path(), e))?;
    staged.as_file().sync_all().map_err(|e| BuildError::io(staged.path(), e))?;
    staged.persist(path).map_err(|e| BuildError::io(path, e.error))?;
    Ok(())
}
