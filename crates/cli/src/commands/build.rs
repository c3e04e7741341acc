use anyhow::{Context, Result};
use flatbin_core::{build_fixtures, BuildConfig, BuildReport, Toolchain};

/// Build every fixture and fail unless all of them produced an image.
pub fn build_command(config: &BuildConfig, json: bool) -> Result<BuildReport> {
    let report = run_build(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    report.barrier()?;
    Ok(report)
}

pub(crate) fn run_build(config: &BuildConfig) -> Result<BuildReport> {
    let toolchain = Toolchain::from_config(config).context("Failed to set up toolchain")?;
    build_fixtures(config, &toolchain)
        .with_context(|| format!("Failed to build fixtures in {}", config.fixtures_dir.display()))
}

pub(crate) fn print_report(report: &BuildReport) {
    if report.outcomes.is_empty() {
        println!("No fixtures found in {}.", report.fixtures_dir.display());
        return;
    }

    println!("Build results ({}):", report.fixtures_dir.display());
    for outcome in &report.outcomes {
        let name = outcome.target.name();
        match (&outcome.artifact, &outcome.failure) {
            (Some(artifact), _) if outcome.skipped => {
                println!("  [up to date] {} ({} bytes)", name, artifact.len)
            }
            (Some(artifact), _) => {
                println!("  [built] {} ({} bytes, sha256 {})", name, artifact.len, artifact.sha256)
            }
            (None, Some(failure)) => {
                println!("  [failed at {}] {}: {}", failure.reached.as_str(), name, failure.message)
            }
            (None, None) => println!("  [{}] {}", outcome.state.as_str(), name),
        }
    }
    let built = report.succeeded().count();
    println!("{} of {} images ready.", built, report.outcomes.len());
}
