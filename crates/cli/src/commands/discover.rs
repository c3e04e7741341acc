use anyhow::{Context, Result};
use flatbin_core::discovery::{discover_targets, DiscoveryOptions};
use flatbin_core::BuildConfig;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct TargetListing {
    source: String,
    kind: &'static str,
    output: String,
    intermediate: Option<String>,
    up_to_date: bool,
}

/// List the build targets found in the fixtures directory.
pub fn discover_command(config: &BuildConfig, json: bool) -> Result<()> {
    let options = DiscoveryOptions { include_c: config.include_c };
    let targets = discover_targets(&config.fixtures_dir, &options)
        .with_context(|| format!("Failed to scan {}", config.fixtures_dir.display()))?;

    if json {
        let listing: Vec<TargetListing> = targets
            .iter()
            .map(|t| TargetListing {
                source: t.source.path.display().to_string(),
                kind: t.source.kind.as_str(),
                output: t.output.display().to_string(),
                intermediate: t.intermediate.as_ref().map(|p| p.display().to_string()),
                up_to_date: flatbin_core::builder::is_up_to_date(t),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if targets.is_empty() {
        println!("No fixtures found in {}.", config.fixtures_dir.display());
        return Ok(());
    }

    println!("Fixtures in {}:", config.fixtures_dir.display());
    for target in &targets {
        println!(
            "  - {} [{}] -> {}",
            target.name(),
            target.source.kind.as_str(),
            target.output.display()
        );
    }
    Ok(())
}
