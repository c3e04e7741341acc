use anyhow::{Context, Result};
use flatbin_core::clean::clean;
use flatbin_core::BuildConfig;

/// Remove generated images and lowered assembly from the fixtures directory.
pub fn clean_command(config: &BuildConfig) -> Result<()> {
    let removed = clean(&config.fixtures_dir)
        .with_context(|| format!("Failed to clean {}", config.fixtures_dir.display()))?;

    if removed.is_empty() {
        println!("Nothing to clean in {}.", config.fixtures_dir.display());
    } else {
        println!("Removed {} file(s):", removed.len());
        for path in &removed {
            println!("  - {}", path.display());
        }
    }
    Ok(())
}
