//! flatbin-core
//!
//! Core library for turning hand-written RISC-V assembly (and C) fixtures into
//! raw flat images linked at a fixed base address, ready to be loaded into a
//! simulated memory by a test harness.
//!
//! Pipeline: [`discovery`] finds sources, [`builder`] drives each one through a
//! [`toolchain`] (lower → assemble+link → extract), and [`pipeline`] runs the
//! whole set and provides the barrier tests wait on. [`clean`] undoes it.

pub mod builder;
pub mod clean;
pub mod config;
pub mod discovery;
pub mod error;
pub mod image;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod toolchain;

pub use builder::{ImageBuilder, TargetFailure, TargetOutcome};
pub use config::{BuildConfig, ExtractorKind, LinkConfig, ToolchainConfig};
pub use error::{BuildError, BuildResult};
pub use model::{BuildTarget, SourceKind, SourceUnit, TargetState};
pub use pipeline::{build_fixtures, BuildReport, BuildRunner};
pub use toolchain::{Compiler, Extractor, Toolchain};

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
