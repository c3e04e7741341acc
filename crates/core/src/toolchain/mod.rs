//! Cross-toolchain adapters.
//!
//! The pipeline only needs two capabilities from the outside world:
//! - a [`Compiler`] that lowers C to assembly and assembles+links at a fixed
//!   base address with no runtime, and
//! - an [`Extractor`] that turns the linked container into raw loadable bytes.
//!
//! Both are traits so tests (and other targets) can substitute their own.

use std::path::Path;
use std::process::{Command, Output};

use crate::config::{BuildConfig, ExtractorKind, LinkConfig};
use crate::error::{BuildError, BuildResult};

#[cfg(feature = "elf-extractor")]
pub mod elf;
pub mod gnu;

#[cfg(feature = "elf-extractor")]
pub use elf::ElfExtractor;
pub use gnu::{GnuCompiler, ObjcopyExtractor};

/// Compiles sources into a linked executable container.
pub trait Compiler: Send + Sync {
    fn name(&self) -> &str;

    /// Lower a C source to assembly at `output`.
    fn lower_to_assembly(&self, source: &Path, output: &Path) -> BuildResult<()>;

    /// Assemble and link an assembly source into a container at `output`.
    fn assemble_and_link(&self, source: &Path, output: &Path, link: &LinkConfig)
        -> BuildResult<()>;

    /// Version string reported by the tool, when it can be queried.
    fn version(&self) -> Option<String> {
        None
    }
}

/// Strips a linked container down to its loadable bytes.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    /// Return the flat image for `container`. Must be a pure function of the
    /// container's contents.
    fn extract(&self, container: &Path) -> BuildResult<Vec<u8>>;

    fn version(&self) -> Option<String> {
        None
    }
}

/// A compiler and an extractor, selected together.
pub struct Toolchain {
    pub compiler: Box<dyn Compiler>,
    pub extractor: Box<dyn Extractor>,
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain")
            .field("compiler", &self.compiler.name())
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

impl Toolchain {
    pub fn new(compiler: Box<dyn Compiler>, extractor: Box<dyn Extractor>) -> Self {
        Self { compiler, extractor }
    }

    /// GNU cross toolchain as described by `config`.
    pub fn from_config(config: &BuildConfig) -> BuildResult<Self> {
        config.validate()?;
        let compiler = Box::new(GnuCompiler::from_config(&config.toolchain));
        let extractor: Box<dyn Extractor> = match config.extractor {
            ExtractorKind::Objcopy => {
                Box::new(ObjcopyExtractor::new(config.toolchain.objcopy_path()))
            }
            #[cfg(feature = "elf-extractor")]
            ExtractorKind::Elf => Box::new(ElfExtractor::default()),
            #[cfg(not(feature = "elf-extractor"))]
            ExtractorKind::Elf => {
                return Err(BuildError::InvalidConfig(
                    "the elf extractor requires the `elf-extractor` feature".into(),
                ))
            }
        };
        Ok(Self { compiler, extractor })
    }
}

/// How a nonzero exit from a tool should be reported.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FailureKind {
    Rejected,
    Extraction,
}

/// Run a tool to completion, mapping spawn failures to `ToolUnavailable` and
/// nonzero exits to a per-target error that carries the tool's stderr.
pub(crate) fn run_tool(
    mut command: Command,
    tool: &Path,
    subject: &Path,
    failure: FailureKind,
) -> BuildResult<Output> {
    tracing::debug!(command = ?command, "running tool");
    let output = command.output().map_err(|source| BuildError::ToolUnavailable {
        tool: tool.display().to_string(),
        source,
    })?;
    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let diagnostic = if stderr.is_empty() {
        format!("{} exited with {}", tool.display(), output.status)
    } else {
        stderr
    };
    Err(match failure {
        FailureKind::Rejected => BuildError::SourceRejected {
            path: subject.to_path_buf(),
            tool: tool.display().to_string(),
            diagnostic,
        },
        FailureKind::Extraction => {
            BuildError::ExtractionFailed { path: subject.to_path_buf(), reason: diagnostic }
        }
    })
}

/// First non-empty line a tool prints for `flag`, if it runs successfully.
pub(crate) fn probe_version(tool: &Path, flag: &str) -> Option<String> {
    Command::new(tool).arg(flag).output().ok().and_then(|out| {
        if !out.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        let line = stdout.lines().next().unwrap_or("").trim().to_string();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    })
}
