use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use flatbin_core::config::{BuildConfig, ExtractorKind, DEFAULT_CONFIG_FILE};

use crate::canonicalize_or_current;

/// Environment variable consulted (once, here) for the cross-toolchain prefix.
pub const TOOLCHAIN_PREFIX_ENV: &str = "FLATBIN_TOOLCHAIN_PREFIX";

/// Command-line overrides layered on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub fixtures: Option<String>,
    pub prefix: Option<String>,
    pub gcc: Option<String>,
    pub objcopy: Option<String>,
    pub march: Option<String>,
    pub mabi: Option<String>,
    pub base_address: Option<u64>,
    pub extractor: Option<String>,
    pub no_c: bool,
    pub jobs: Option<usize>,
    pub fail_fast: bool,
    pub force: bool,
}

/// Build the effective configuration.
///
/// Precedence: explicit flags, then `FLATBIN_TOOLCHAIN_PREFIX` (prefix only),
/// then the config file (`--config`, or `flatbin.json` in the working
/// directory if present), then defaults.
pub fn resolve_config(
    config_path: Option<&str>,
    overrides: &BuildOverrides,
) -> Result<BuildConfig> {
    let mut config = match config_path {
        Some(path) => BuildConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config {path}"))?,
        None => {
            let implicit = env::current_dir()
                .context("Failed to get current directory")?
                .join(DEFAULT_CONFIG_FILE);
            if implicit.is_file() {
                BuildConfig::load(&implicit)
                    .with_context(|| format!("Failed to load config {}", implicit.display()))?
            } else {
                BuildConfig::default()
            }
        }
    };

    if let Some(fixtures) = &overrides.fixtures {
        config.fixtures_dir = canonicalize_or_current(fixtures)?;
    } else if config.fixtures_dir.is_relative() {
        config.fixtures_dir = canonicalize_or_current(&config.fixtures_dir.to_string_lossy())?;
    }

    if let Some(prefix) = overrides.prefix.clone().or_else(|| env::var(TOOLCHAIN_PREFIX_ENV).ok()) {
        config.toolchain.prefix = prefix;
    }
    if let Some(gcc) = &overrides.gcc {
        config.toolchain.gcc = Some(PathBuf::from(gcc));
    }
    if let Some(objcopy) = &overrides.objcopy {
        config.toolchain.objcopy = Some(PathBuf::from(objcopy));
    }
    if let Some(march) = &overrides.march {
        config.toolchain.march = Some(march.clone());
    }
    if let Some(mabi) = &overrides.mabi {
        config.toolchain.mabi = Some(mabi.clone());
    }
    if let Some(base) = overrides.base_address {
        config.link.base_address = base;
    }
    if let Some(extractor) = &overrides.extractor {
        config.extractor = ExtractorKind::parse(extractor)?;
    }
    if overrides.no_c {
        config.include_c = false;
    }
    if let Some(jobs) = overrides.jobs {
        config.jobs = jobs;
    }
    config.fail_fast |= overrides.fail_fast;
    config.force |= overrides.force;

    config.validate()?;
    Ok(config)
}

/// Parse an address given as hex (`0x8000_0000`) or decimal.
pub fn parse_address(raw: &str) -> Result<u64> {
    let cleaned = raw.trim().replace('_', "");
    let parsed = match cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    };
    parsed.map_err(|e| anyhow!("Invalid address '{}': {}", raw, e))
}

/// Look for an executable by name on `PATH`.
pub fn find_in_path(executable: &str) -> Option<PathBuf> {
    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths).find_map(|p| {
            let candidate = p.join(executable);
            if candidate.is_file() {
                Some(candidate)
            } else {
                None
            }
        })
    })
}

/// Resolve a configured tool to a concrete file: explicit paths as given,
/// bare names via `PATH`.
pub fn locate_tool(tool: &Path) -> Option<PathBuf> {
    if tool.components().count() > 1 || tool.is_absolute() {
        return tool.is_file().then(|| tool.to_path_buf());
    }
    find_in_path(&tool.to_string_lossy())
}
