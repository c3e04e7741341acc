use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{LinkConfig, ToolchainConfig};
use crate::error::{BuildError, BuildResult};
use crate::toolchain::{probe_version, run_tool, Compiler, Extractor, FailureKind};

/// GCC cross compiler driver (`riscv64-unknown-elf-gcc` by default).
#[derive(Debug, Clone)]
pub struct GnuCompiler {
    pub gcc: PathBuf,
    pub march: Option<String>,
    pub mabi: Option<String>,
    pub cflags: Vec<String>,
}

impl GnuCompiler {
    pub fn new(gcc: impl Into<PathBuf>) -> Self {
        Self { gcc: gcc.into(), march: None, mabi: None, cflags: Vec::new() }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self {
            gcc: config.gcc_path(),
            march: config.march.clone(),
            mabi: config.mabi.clone(),
            cflags: config.cflags.clone(),
        }
    }

    /// Flags shared by every invocation: extra cflags, then target selection.
    pub fn common_args(&self) -> Vec<String> {
        let mut args = self.cflags.clone();
        if let Some(march) = &self.march {
            args.push(format!("-march={march}"));
        }
        if let Some(mabi) = &self.mabi {
            args.push(format!("-mabi={mabi}"));
        }
        args
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new(&self.gcc);
        command.args(self.common_args());
        command
    }
}

impl Compiler for GnuCompiler {
    fn name(&self) -> &str {
        "gcc"
    }

    fn lower_to_assembly(&self, source: &Path, output: &Path) -> BuildResult<()> {
        let mut command = self.base_command();
        command.args(["-S", "-ffreestanding", "-fno-pic", "-o"]).arg(output).arg(source);
        run_tool(command, &self.gcc, source, FailureKind::Rejected)?;
        Ok(())
    }

    fn assemble_and_link(
        &self,
        source: &Path,
        output: &Path,
        link: &LinkConfig,
    ) -> BuildResult<()> {
        let mut command = self.base_command();
        command.args(link.driver_args()).arg("-o").arg(output).arg(source);
        run_tool(command, &self.gcc, source, FailureKind::Rejected)?;
        Ok(())
    }

    fn version(&self) -> Option<String> {
        probe_version(&self.gcc, "--version")
    }
}

/// `objcopy -O binary`: writes the loadable sections as one flat file.
#[derive(Debug, Clone)]
pub struct ObjcopyExtractor {
    pub objcopy: PathBuf,
}

impl ObjcopyExtractor {
    pub fn new(objcopy: impl Into<PathBuf>) -> Self {
        Self { objcopy: objcopy.into() }
    }
}

impl Extractor for ObjcopyExtractor {
    fn name(&self) -> &str {
        "objcopy"
    }

    fn extract(&self, container: &Path) -> BuildResult<Vec<u8>> {
        let scratch = tempfile::Builder::new()
            .prefix(".flatbin-objcopy-")
            .suffix(".bin")
            .tempfile()
            .map_err(|e| BuildError::io(std::env::temp_dir(), e))?;

        let mut command = Command::new(&self.objcopy);
        command.args(["-O", "binary"]).arg(container).arg(scratch.path());
        run_tool(command, &self.objcopy, container, FailureKind::Extraction)?;

        // objcopy may replace the file rather than write through our handle.
        fs::read(scratch.path()).map_err(|e| BuildError::io(scratch.path(), e))
    }

    fn version(&self) -> Option<String> {
        probe_version(&self.objcopy, "--version")
    }
}
