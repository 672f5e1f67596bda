//! Process runners that execute one test script in an external runtime.
//!
//! The JVM launcher is the production implementation; anything that can turn
//! a [`LaunchConfig`] into an exit status can stand in for it.

mod java;

pub use java::JavaRunner;

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::rundir::IsolationDir;

/// Everything needed to launch the runtime for one test.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Test identifier, used for logging.
    pub test_id: String,
    /// Script the harness entry point executes.
    pub script_path: PathBuf,
    /// Data and log destination for this test.
    pub isolation: IsolationDir,
    /// Artifact placed on the runtime classpath.
    pub artifact: PathBuf,
    /// Maximum heap size, e.g. `2G`.
    pub heap_size: String,
    /// Extra runtime flags, one argument each.
    pub runtime_flags: Vec<String>,
    /// Kill the process after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Write stdout/stderr into the isolation directory instead of discarding.
    pub keep_output: bool,
}

/// Result of one runtime invocation.
#[derive(Debug)]
pub struct LaunchResult {
    /// Exit status of the process. `None` if it was killed on timeout.
    pub exit_status: Option<ExitStatus>,
    /// Whether the process was killed because it exceeded the timeout.
    pub timed_out: bool,
    /// Whether the test passed (exit code 0).
    pub success: bool,
}

impl LaunchResult {
    /// Builds a result from a process exit status.
    pub fn exited(status: ExitStatus) -> Self {
        Self {
            exit_status: Some(status),
            timed_out: false,
            success: status.success(),
        }
    }

    /// Builds the result of a process killed on timeout.
    pub fn timed_out() -> Self {
        Self {
            exit_status: None,
            timed_out: true,
            success: false,
        }
    }
}

/// Trait for test launchers.
#[async_trait]
pub trait TestLauncher: Send + Sync {
    /// Runs one test to completion.
    ///
    /// Returns `Err(Error::TestExecution)` if the process could not be started.
    async fn launch(&self, config: LaunchConfig) -> Result<LaunchResult>;

    /// Returns the name of this launcher.
    fn name(&self) -> &str;
}
