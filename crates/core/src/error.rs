use std::path::PathBuf;

use thiserror::Error;

/// Error type for discovery, image building, and cleaning.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The external compiler or extractor could not be spawned at all.
    ///
    /// This aborts the whole run: no other target can succeed either.
    #[error("Tool unavailable: failed to run {tool}: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler rejected a source unit (syntax/semantic error).
    #[error("{tool} rejected {}: {diagnostic}", path.display())]
    SourceRejected { path: PathBuf, tool: String, diagnostic: String },

    /// Turning a linked container into a flat image failed.
    #[error("Failed to extract flat image from {}: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    /// Filesystem error tied to a specific path.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Several sources would write the same image (e.g. `boot.s` and `boot.S`).
    #[error("{} would be written by several sources: {}", output.display(), join_paths(sources))]
    OutputConflict { output: PathBuf, sources: Vec<PathBuf> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// One or more targets did not reach a successful terminal state.
    #[error("Build barrier failed: {} target(s) failed: {}", failed.len(), join_paths(failed))]
    BarrierFailed { failed: Vec<PathBuf> },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io { path: path.into(), source }
    }

    /// True for errors that make every remaining target pointless to attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BuildError::ToolUnavailable { .. } | BuildError::InvalidConfig(_))
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

/// Convenience result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;
