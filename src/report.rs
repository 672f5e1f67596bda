//! Test outcomes and the run summary report.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::clock::format_timestamp;
use crate::rundir::IsolationDir;

/// Exit code for a run with no failures.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a run with failures or a fatal precondition.
pub const EXIT_FAILURE: i32 = 1;

const RULE: &str = "--------------------------------------------------------";

/// Outcome of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not yet executed.
    Pending,
    /// Runtime exited with code 0.
    Pass,
    /// Runtime exited non-zero, timed out, or could not be launched.
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Pending => "Pending",
            Outcome::Pass => "Pass",
            Outcome::Fail => "Fail",
        };
        f.write_str(label)
    }
}

/// One discovered test and, once run, its outcome.
#[derive(Debug, Clone)]
pub struct TestCase {
    id: String,
    script_path: PathBuf,
    isolation: IsolationDir,
    outcome: Outcome,
}

impl TestCase {
    /// Creates a pending test case.
    pub fn new(id: impl Into<String>, script_path: PathBuf, isolation: IsolationDir) -> Self {
        Self {
            id: id.into(),
            script_path,
            isolation,
            outcome: Outcome::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn data_path(&self) -> &Path {
        self.isolation.data_path()
    }

    pub fn log_path(&self) -> &Path {
        self.isolation.log_path()
    }

    pub fn isolation(&self) -> &IsolationDir {
        &self.isolation
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Records the outcome. Only the first call after creation takes effect.
    pub fn record(&mut self, passed: bool) {
        if self.outcome != Outcome::Pending {
            tracing::warn!(test = %self.id, outcome = %self.outcome, "outcome already recorded");
            return;
        }
        self.outcome = if passed { Outcome::Pass } else { Outcome::Fail };
    }
}

/// Aggregated results of one run, in discovery order.
#[derive(Debug, Clone)]
pub struct RunReport {
    started: DateTime<Local>,
    finished: Option<DateTime<Local>>,
    tests: Vec<TestCase>,
    failures: usize,
}

impl RunReport {
    /// Starts a report at the given time.
    pub fn begin(started: DateTime<Local>) -> Self {
        Self {
            started,
            finished: None,
            tests: Vec::new(),
            failures: 0,
        }
    }

    /// Adds a completed test case.
    pub fn record(&mut self, test: TestCase) {
        if test.outcome() != Outcome::Pass {
            self.failures += 1;
        }
        self.tests.push(test);
    }

    /// Marks the report complete.
    pub fn finish(&mut self, finished: DateTime<Local>) {
        self.finished = Some(finished);
    }

    pub fn total(&self) -> usize {
        self.tests.len()
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn passed(&self) -> usize {
        self.total() - self.failures
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    pub fn finished(&self) -> Option<DateTime<Local>> {
        self.finished
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if self.failures == 0 {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }

    /// Writes the human-readable report.
    pub fn render(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "Start stress run at {}", format_timestamp(&self.started))?;
        writeln!(out, "{}", RULE)?;
        for test in &self.tests {
            writeln!(out, "{} {}", test.id(), test.outcome())?;
        }
        writeln!(out, "{}", RULE)?;
        let finished = self.finished.unwrap_or(self.started);
        writeln!(out, "  End stress run at {}", format_timestamp(&finished))?;
        writeln!(out, "tests run: {}", self.total())?;
        writeln!(out, "test failures: {}", self.failures)?;
        out.flush()
    }
}
