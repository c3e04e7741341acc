//! Runs the image builder over a set of targets and enforces the barrier a
//! downstream test run waits on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::builder::{remove_if_exists, ImageBuilder, TargetOutcome};
use crate::config::BuildConfig;
use crate::discovery::{discover_targets, DiscoveryOptions};
use crate::error::{BuildError, BuildResult};
use crate::model::BuildTarget;
use crate::toolchain::Toolchain;

/// Outcome of one build invocation over a fixtures directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub fixtures_dir: PathBuf,
    pub started_at: String,
    pub finished_at: String,
    /// One entry per target, ordered by source path.
    pub outcomes: Vec<TargetOutcome>,
}

impl BuildReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TargetOutcome::succeeded)
    }

    /// Gate for the downstream consumer: `Ok` only when every target reached
    /// `Extracted`. Zero targets pass trivially.
    pub fn barrier(&self) -> BuildResult<()> {
        let failed: Vec<PathBuf> = self.failed().map(|o| o.target.source.path.clone()).collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(BuildError::BarrierFailed { failed })
        }
    }
}

/// Schedules targets on the builder, sequentially or on a rayon pool.
#[derive(Debug)]
pub struct BuildRunner<'a> {
    builder: ImageBuilder<'a>,
    jobs: usize,
    fail_fast: bool,
}

impl<'a> BuildRunner<'a> {
    pub fn new(builder: ImageBuilder<'a>) -> Self {
        Self { builder, jobs: 1, fail_fast: false }
    }

    /// Worker threads; `0` lets rayon pick, `1` runs on the calling thread.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Stop starting new targets after the first failure.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn run(&self, fixtures_dir: &Path, targets: &[BuildTarget]) -> BuildResult<BuildReport> {
        let started_at = Utc::now().to_rfc3339();
        let stop = AtomicBool::new(false);
        let conflicts = output_conflicts(targets);

        let outcomes: Vec<TargetOutcome> = if self.jobs == 1 {
            targets.iter().map(|t| self.run_one(t, &conflicts, &stop)).collect()
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()
                .map_err(|e| BuildError::InvalidConfig(format!("cannot start build pool: {e}")))?;
            pool.install(|| {
                targets.par_iter().map(|t| self.run_one(t, &conflicts, &stop)).collect()
            })
        };

        let report = BuildReport {
            fixtures_dir: fixtures_dir.to_path_buf(),
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            outcomes,
        };
        info!(
            fixtures = %fixtures_dir.display(),
            targets = report.outcomes.len(),
            failed = report.failed().count(),
            "build finished"
        );
        Ok(report)
    }

    fn run_one(
        &self,
        target: &BuildTarget,
        conflicts: &HashMap<PathBuf, Vec<PathBuf>>,
        stop: &AtomicBool,
    ) -> TargetOutcome {
        if stop.load(Ordering::SeqCst) {
            return TargetOutcome::not_started(target, "not started: an earlier target failed");
        }
        let outcome = match conflicts.get(&target.output) {
            Some(sources) => {
                let error = BuildError::OutputConflict {
                    output: target.output.clone(),
                    sources: sources.clone(),
                };
                warn!(target = %target.name(), error = %error, "ambiguous fixture; not building");
                // Neither source owns the image, so no earlier copy may survive.
                if let Err(e) = remove_if_exists(&target.output) {
                    warn!(target = %target.name(), error = %e, "cannot remove stale image");
                }
                TargetOutcome::refused(target, &error)
            }
            None => self.builder.build(target),
        };
        if let Some(failure) = &outcome.failure {
            if failure.fatal || self.fail_fast {
                if failure.fatal {
                    warn!(target = %target.name(), "toolchain unavailable; stopping the build");
                }
                stop.store(true, Ordering::SeqCst);
            }
        }
        outcome
    }
}

/// Outputs claimed by more than one target, with the sources claiming them.
fn output_conflicts(targets: &[BuildTarget]) -> HashMap<PathBuf, Vec<PathBuf>> {
    let mut claims: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
    for target in targets {
        claims.entry(target.output.clone()).or_default().push(target.source.path.clone());
    }
    claims.retain(|_, sources| sources.len() > 1);
    claims
}

/// Discover every target under `config.fixtures_dir` and build it.
pub fn build_fixtures(config: &BuildConfig, toolchain: &Toolchain) -> BuildResult<BuildReport> {
    config.validate()?;
    let options = DiscoveryOptions { include_c: config.include_c };
    let targets = discover_targets(&config.fixtures_dir, &options)?;
    let builder = ImageBuilder::new(toolchain, config.link.clone()).force(config.force);
    BuildRunner::new(builder)
        .jobs(config.jobs)
        .fail_fast(config.fail_fast)
        .run(&config.fixtures_dir, &targets)
}
