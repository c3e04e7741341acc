use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};

/// Default cross-toolchain prefix (`<prefix>gcc`, `<prefix>objcopy`).
pub const DEFAULT_TOOLCHAIN_PREFIX: &str = "riscv64-unknown-elf-";

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "flatbin.json";

/// Base integer ISA without the `C` extension: every instruction is 32 bits,
/// which is what the simulated core fetches.
pub const DEFAULT_MARCH: &str = "rv64i";
pub const DEFAULT_MABI: &str = "lp64";

/// Link-time policy for bare images.
///
/// The "no runtime" contract lives here as data rather than as a flag buried in
/// the compiler adapter, so a different base address or target can be swapped
/// in without touching extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Address the first image byte is linked at.
    #[serde(default)]
    pub base_address: u64,
    /// Entry symbols to request from the linker. Empty means none: the image
    /// starts at `base_address` with whatever the author wrote first.
    #[serde(default)]
    pub entry_points: Vec<String>,
    /// Exclude crt0/startfiles and default libraries.
    #[serde(default = "default_true")]
    pub no_runtime: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { base_address: 0, entry_points: Vec::new(), no_runtime: true }
    }
}

impl LinkConfig {
    /// Linker-driver arguments implementing this policy.
    pub fn driver_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.no_runtime {
            args.extend(["-nostdlib", "-nostartfiles", "-static"].map(String::from));
        }
        args.push(format!("-Wl,-Ttext=0x{:x}", self.base_address));
        args.push("-Wl,--build-id=none".to_string());
        for entry in &self.entry_points {
            args.push(format!("-Wl,--entry={entry}"));
        }
        args
    }
}

/// Which extractor turns linked containers into flat images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// `<prefix>objcopy -O binary`.
    #[default]
    Objcopy,
    /// Built-in ELF section extractor.
    Elf,
}

impl ExtractorKind {
    pub fn parse(name: &str) -> BuildResult<Self> {
        match name {
            "objcopy" => Ok(ExtractorKind::Objcopy),
            "elf" => Ok(ExtractorKind::Elf),
            other => Err(BuildError::InvalidConfig(format!(
                "Unknown extractor '{other}'. Allowed: objcopy, elf"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::Objcopy => "objcopy",
            ExtractorKind::Elf => "elf",
        }
    }
}

/// Where the cross tools live and how to invoke them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Explicit compiler driver path; overrides `<prefix>gcc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcc: Option<PathBuf>,
    /// Explicit objcopy path; overrides `<prefix>objcopy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objcopy: Option<PathBuf>,
    /// `-march`; `null` leaves the compiler's own default (usually with `C`).
    #[serde(default = "default_march", skip_serializing_if = "Option::is_none")]
    pub march: Option<String>,
    #[serde(default = "default_mabi", skip_serializing_if = "Option::is_none")]
    pub mabi: Option<String>,
    /// Extra flags passed to every compiler invocation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cflags: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            gcc: None,
            objcopy: None,
            march: default_march(),
            mabi: default_mabi(),
            cflags: Vec::new(),
        }
    }
}

impl ToolchainConfig {
    pub fn gcc_path(&self) -> PathBuf {
        self.gcc.clone().unwrap_or_else(|| PathBuf::from(format!("{}gcc", self.prefix)))
    }

    pub fn objcopy_path(&self) -> PathBuf {
        self.objcopy.clone().unwrap_or_else(|| PathBuf::from(format!("{}objcopy", self.prefix)))
    }
}

/// Serializable configuration for a fixture build.
///
/// Everything the pipeline needs is carried here explicitly; the library never
/// consults the environment or the current directory on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory holding the fixture sources.
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: PathBuf,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub extractor: ExtractorKind,
    /// Discover and build `.c` sources.
    #[serde(default = "default_true")]
    pub include_c: bool,
    /// Worker threads; `0` lets rayon decide, `1` builds sequentially.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Stop starting new targets after the first failure.
    #[serde(default)]
    pub fail_fast: bool,
    /// Rebuild targets even when their image is newer than the source.
    #[serde(default)]
    pub force: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            fixtures_dir: default_fixtures_dir(),
            toolchain: ToolchainConfig::default(),
            link: LinkConfig::default(),
            extractor: ExtractorKind::default(),
            include_c: true,
            jobs: default_jobs(),
            fail_fast: false,
            force: false,
        }
    }
}

impl BuildConfig {
    /// Default configuration for a given fixtures directory.
    pub fn for_fixtures(dir: impl Into<PathBuf>) -> Self {
        Self { fixtures_dir: dir.into(), ..Self::default() }
    }

    /// Load a config from JSON (`.json`) or YAML (`.yaml`/`.yml`).
    ///
    /// Relative `fixtures_dir` values are resolved against the file's directory.
    pub fn load(path: &Path) -> BuildResult<Self> {
        let body = std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let mut config: BuildConfig = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&body).map_err(|e| {
                BuildError::InvalidConfig(format!("{}: {e}", path.display()))
            })?,
            _ => serde_json::from_str(&body).map_err(|e| {
                BuildError::InvalidConfig(format!("{}: {e}", path.display()))
            })?,
        };
        if config.fixtures_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.fixtures_dir = parent.join(&config.fixtures_dir);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the builder cannot honor.
    pub fn validate(&self) -> BuildResult<()> {
        if self.toolchain.prefix.is_empty()
            && (self.toolchain.gcc.is_none()
                || (self.extractor == ExtractorKind::Objcopy && self.toolchain.objcopy.is_none()))
        {
            return Err(BuildError::InvalidConfig(
                "toolchain prefix is empty and no explicit tool paths are set".into(),
            ));
        }
        if self.link.entry_points.iter().any(|e| e.trim().is_empty()) {
            return Err(BuildError::InvalidConfig("entry point names must be non-empty".into()));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_march() -> Option<String> {
    Some(DEFAULT_MARCH.to_string())
}

fn default_mabi() -> Option<String> {
    Some(DEFAULT_MABI.to_string())
}

fn default_prefix() -> String {
    DEFAULT_TOOLCHAIN_PREFIX.to_string()
}

fn default_fixtures_dir() -> PathBuf {
    PathBuf::from("tests")
}

fn default_jobs() -> usize {
    1
}
