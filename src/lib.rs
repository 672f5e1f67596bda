//! Stress Harness - runs scripted stress tests against a packaged build artifact
//!
//! Each test script is executed by an external runtime process in its own
//! directory under a freshly regenerated run directory. Results are collected
//! into a summary report whose exit code gates CI.

pub mod artifact;
pub mod cli;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod rundir;
pub mod runner;

pub use artifact::{ArtifactReference, Version};
pub use cli::Cli;
pub use clock::{Clock, SystemClock};
pub use config::{ArtifactSource, RunConfiguration, RunOptions, Validate, ValidationResult};
pub use error::Error;
pub use orchestrator::StressHarness;
pub use report::{Outcome, RunReport, TestCase, EXIT_FAILURE, EXIT_SUCCESS};
pub use rundir::{IsolationDir, RunDirectory};
pub use runner::{JavaRunner, LaunchConfig, LaunchResult, TestLauncher};
