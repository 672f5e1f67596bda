//! The run loop.
//!
//! Resolves the artifact, discovers tests, regenerates the run directory and
//! then runs every test in discovery order, one process at a time.

use std::path::{Path, PathBuf};

use tracing::Instrument;

use crate::artifact::{self, ArtifactReference};
use crate::clock::{Clock, SystemClock};
use crate::config::RunConfiguration;
use crate::discovery;
use crate::error::Result;
use crate::report::{RunReport, TestCase};
use crate::rundir::{self, RunDirectory};
use crate::runner::{LaunchConfig, TestLauncher};

/// Drives one complete stress run.
pub struct StressHarness<L: TestLauncher, C: Clock = SystemClock> {
    config: RunConfiguration,
    launcher: L,
    clock: C,
}

impl<L: TestLauncher> StressHarness<L, SystemClock> {
    /// Creates a harness that timestamps with the system clock.
    pub fn new(config: RunConfiguration, launcher: L) -> Self {
        Self::with_clock(config, launcher, SystemClock)
    }
}

impl<L: TestLauncher, C: Clock> StressHarness<L, C> {
    /// Creates a harness with an explicit clock.
    pub fn with_clock(config: RunConfiguration, launcher: L, clock: C) -> Self {
        Self {
            config,
            launcher,
            clock,
        }
    }

    /// Returns the run configuration.
    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Runs every discovered test and returns the finished report.
    ///
    /// Errors are fatal preconditions (configuration, missing artifact,
    /// directory creation). Individual test failures are recorded in the
    /// report instead.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("stress_run", run_id = %run_id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<RunReport> {
        let artifact = artifact::locate(&self.config)?;
        tracing::info!(artifact = ?artifact.path(), "resolved artifact");

        let test_ids = discovery::discover(&self.config)?;
        let test_dir = absolute(&self.config.test_dir)?;
        rundir::ensure_disjoint(&self.config.run_dir, &test_dir, &[artifact.path()])?;
        let run_dir = RunDirectory::prepare(&self.config.run_dir)?;

        tracing::info!(
            tests = test_ids.len(),
            launcher = %self.launcher.name(),
            run_dir = ?run_dir.root(),
            "starting stress run"
        );

        let mut report = RunReport::begin(self.clock.now());

        for id in test_ids {
            let isolation = run_dir.isolate(&id)?;
            let mut test = TestCase::new(id.as_str(), test_dir.join(&id), isolation);

            let passed = self.execute(&test, &artifact).await;
            test.record(passed);
            tracing::info!(test = %test.id(), outcome = %test.outcome(), "test finished");

            report.record(test);
        }

        report.finish(self.clock.now());
        tracing::info!(
            total = report.total(),
            failures = report.failures(),
            "stress run complete"
        );
        Ok(report)
    }

    /// Runs one test. Launch errors count as a failure.
    async fn execute(&self, test: &TestCase, artifact: &ArtifactReference) -> bool {
        let launch = LaunchConfig {
            test_id: test.id().to_string(),
            script_path: test.script_path().to_path_buf(),
            isolation: test.isolation().clone(),
            artifact: artifact.path().to_path_buf(),
            heap_size: self.config.heap_size.clone(),
            runtime_flags: self.config.runtime_flag_args(),
            timeout: self.config.timeout,
            keep_output: self.config.keep_output,
        };

        tracing::info!(test = %test.id(), "running test");

        match self.launcher.launch(launch).await {
            Ok(result) => {
                if result.timed_out {
                    tracing::warn!(test = %test.id(), "test timed out");
                }
                result.success
            }
            Err(e) => {
                tracing::warn!(test = %test.id(), error = %e, "test could not be executed");
                false
            }
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
