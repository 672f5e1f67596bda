//! JVM runner for scripted stress tests.

use std::fs::File;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::{DEFAULT_ENTRY_POINT, DEFAULT_RUNTIME};
use crate::error::{Error, Result};

use super::{LaunchConfig, LaunchResult, TestLauncher};

/// Runner that launches the harness entry point in a JVM.
pub struct JavaRunner {
    /// Path to the runtime executable.
    runtime: String,
    /// Main class that interprets a test script.
    entry_point: String,
}

impl Default for JavaRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaRunner {
    /// Creates a runner using `java` from `PATH` and the default entry point.
    pub fn new() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_string(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }

    /// Uses a custom runtime executable.
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Uses a custom entry point class.
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Builds the runtime argument vector.
    fn build_args(&self, config: &LaunchConfig) -> Vec<String> {
        let mut args = vec![format!("-Xmx{}", config.heap_size)];
        args.extend(config.runtime_flags.iter().cloned());
        args.push("-cp".to_string());
        args.push(config.artifact.display().to_string());
        args.push(self.entry_point.clone());
        args.push(format!("script={}", config.script_path.display()));
        args.push(format!(
            "datapath={}",
            config.isolation.data_path().display()
        ));
        args.push(format!("logpath={}", config.isolation.log_path().display()));
        args
    }

    fn output_sinks(&self, config: &LaunchConfig) -> Result<(Stdio, Stdio)> {
        if !config.keep_output {
            return Ok((Stdio::null(), Stdio::null()));
        }

        let open = |path: std::path::PathBuf| {
            File::create(&path).map_err(|e| Error::TestExecution {
                test: config.test_id.clone(),
                reason: format!("cannot create {}: {}", path.display(), e),
            })
        };
        let stdout = open(config.isolation.stdout_log())?;
        let stderr = open(config.isolation.stderr_log())?;
        Ok((Stdio::from(stdout), Stdio::from(stderr)))
    }
}

#[async_trait]
impl TestLauncher for JavaRunner {
    async fn launch(&self, config: LaunchConfig) -> Result<LaunchResult> {
        let args = self.build_args(&config);
        let (stdout, stderr) = self.output_sinks(&config)?;

        tracing::debug!(
            runtime = %self.runtime,
            test = %config.test_id,
            args = ?args,
            "launching runtime"
        );

        let mut child = Command::new(&self.runtime)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::TestExecution {
                test: config.test_id.clone(),
                reason: format!("failed to spawn {}: {}", self.runtime, e),
            })?;

        let wait_error = |e: std::io::Error| Error::TestExecution {
            test: config.test_id.clone(),
            reason: format!("failed to wait for {}: {}", self.runtime, e),
        };

        let Some(limit) = config.timeout else {
            let status = child.wait().await.map_err(wait_error)?;
            return Ok(LaunchResult::exited(status));
        };

        let waited = tokio::time::timeout(limit, child.wait()).await;
        match waited {
            Ok(status) => Ok(LaunchResult::exited(status.map_err(wait_error)?)),
            Err(_) => {
                tracing::warn!(
                    test = %config.test_id,
                    timeout = ?limit,
                    "test exceeded timeout, killing runtime"
                );
                if let Err(e) = child.kill().await {
                    tracing::error!(test = %config.test_id, error = %e, "failed to kill runtime");
                }
                Ok(LaunchResult::timed_out())
            }
        }
    }

    fn name(&self) -> &str {
        "java"
    }
}
