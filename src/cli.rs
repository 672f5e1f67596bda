//! Command-line options.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{RunConfiguration, RunOptions, Validate};
use crate::error::Result;

/// Runs stress test scripts against a packaged build artifact.
///
/// The run directory is deleted and recreated on every invocation.
#[derive(Debug, Parser)]
#[command(name = "stress-harness")]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// TOML file supplying defaults for any option below
    #[arg(long, env = "STRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum heap for each runtime process [default: 2G]
    #[arg(long, env = "STRESS_HEAP_SIZE")]
    pub heap_size: Option<String>,

    /// Extra runtime flags, passed through verbatim
    #[arg(long, env = "STRESS_RUNTIME_FLAGS", allow_hyphen_values = true)]
    pub runtime_flags: Option<String>,

    /// Directory containing the test scripts [default: src/test/resources/tscripts]
    #[arg(long, env = "STRESS_TEST_DIR")]
    pub test_dir: Option<PathBuf>,

    /// Output directory, destroyed and recreated each run [default: target/stress]
    #[arg(long, env = "STRESS_RUN_DIR")]
    pub run_dir: Option<PathBuf>,

    /// Comma-separated test names; empty runs every script in the test directory
    #[arg(long, env = "STRESS_TESTS")]
    pub tests: Option<String>,

    /// Artifact path, or "auto" to derive it from project metadata [default: auto]
    #[arg(long, env = "STRESS_ARTIFACT")]
    pub artifact: Option<String>,

    /// Skip discovered scripts whose name contains this marker
    #[arg(long, env = "STRESS_EXCLUDE")]
    pub exclude: Option<String>,

    /// Runtime executable [default: java]
    #[arg(long, env = "STRESS_RUNTIME")]
    pub runtime: Option<String>,

    /// Harness entry point class [default: com.persistit.test.TestRunner]
    #[arg(long)]
    pub entry_point: Option<String>,

    /// Project metadata file declaring the version [default: project.toml]
    #[arg(long)]
    pub metadata: Option<PathBuf>,

    /// Dotted path of the version field in the metadata [default: project.version]
    #[arg(long)]
    pub version_field: Option<String>,

    /// Artifact path template containing {version}
    #[arg(long)]
    pub artifact_template: Option<String>,

    /// Kill a test's runtime after this many seconds and record it as failed
    #[arg(long, env = "STRESS_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Keep runtime stdout/stderr in each test's directory
    #[arg(long)]
    pub keep_output: bool,
}

impl Cli {
    /// The options given on the command line, as one layer.
    pub fn options(&self) -> RunOptions {
        RunOptions {
            heap_size: self.heap_size.clone(),
            runtime_flags: self.runtime_flags.clone(),
            test_dir: self.test_dir.clone(),
            run_dir: self.run_dir.clone(),
            tests: self.tests.clone(),
            artifact: self.artifact.clone(),
            exclude: self.exclude.clone(),
            runtime: self.runtime.clone(),
            entry_point: self.entry_point.clone(),
            metadata: self.metadata.clone(),
            version_field: self.version_field.clone(),
            artifact_template: self.artifact_template.clone(),
            timeout_secs: self.timeout_secs,
            keep_output: self.keep_output.then_some(true),
        }
    }

    /// Layers flags over the config file and defaults, then validates.
    pub fn resolve(&self) -> Result<RunConfiguration> {
        let file = match &self.config {
            Some(path) => RunOptions::from_file(path)?,
            None => RunOptions::default(),
        };
        let config = file.overlay(self.options()).resolve();

        for warning in config.validate().into_result()? {
            tracing::warn!(%warning, "configuration");
        }
        Ok(config)
    }
}
