use std::process::Command;

use anyhow::{anyhow, Context, Result};
use flatbin_core::BuildConfig;
use tracing::info;

use crate::commands::build::{print_report, run_build};

/// Environment variable telling the test command where the images live.
pub const FIXTURES_DIR_ENV: &str = "FLATBIN_FIXTURES_DIR";

/// Build all fixtures, then run `command` only if every image is in place.
///
/// Returns the exit code of the test command.
pub fn test_command(config: &BuildConfig, command: &[String]) -> Result<i32> {
    let (program, args) =
        command.split_first().ok_or_else(|| anyhow!("No test command given after `--`"))?;

    let report = run_build(config)?;
    print_report(&report);
    report.barrier().context("Refusing to run tests")?;

    info!(program = %program, fixtures = %config.fixtures_dir.display(), "running tests");
    let status = Command::new(program)
        .args(args)
        .env(FIXTURES_DIR_ENV, &config.fixtures_dir)
        .status()
        .with_context(|| format!("Failed to run test command `{}`", program))?;

    // Killed by a signal: report a generic failure.
    Ok(status.code().unwrap_or(1))
}
