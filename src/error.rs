//! Error types for the stress harness.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for harness operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration, detected before any test runs.
    #[error("configuration error: {0}")]
    Config(String),

    /// The resolved artifact does not reference an existing regular file.
    #[error("artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Failed to create the run directory or a per-test isolation directory.
    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single test could not be executed. Recorded as a failure, never fatal.
    #[error("test {test} could not be executed: {reason}")]
    TestExecution { test: String, reason: String },

    /// IO error while writing the report.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error aborts the entire run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::TestExecution { .. })
    }
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
