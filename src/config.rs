//! Run configuration.
//!
//! Options arrive from three layers: command-line flags, an optional TOML
//! file, and built-in defaults. [`RunOptions`] holds any layer with every
//! field optional; [`RunOptions::resolve`] collapses the layers into one
//! [`RunConfiguration`] that is never mutated afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel artifact value that asks for version-derived resolution.
pub const AUTO_ARTIFACT: &str = "auto";

pub const DEFAULT_HEAP_SIZE: &str = "2G";
pub const DEFAULT_TEST_DIR: &str = "src/test/resources/tscripts";
pub const DEFAULT_RUN_DIR: &str = "target/stress";
pub const DEFAULT_RUNTIME: &str = "java";
pub const DEFAULT_ENTRY_POINT: &str = "com.persistit.test.TestRunner";
pub const DEFAULT_METADATA: &str = "project.toml";
pub const DEFAULT_VERSION_FIELD: &str = "project.version";
pub const DEFAULT_ARTIFACT_TEMPLATE: &str = "target/persistit-{version}-jar-with-dependencies.jar";

/// Where the artifact path comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArtifactSource {
    /// Derive the path from project metadata.
    #[default]
    Auto,
    /// Use this path verbatim.
    Path(PathBuf),
}

impl ArtifactSource {
    /// Interprets a user-supplied artifact value.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case(AUTO_ARTIFACT) {
            ArtifactSource::Auto
        } else {
            ArtifactSource::Path(PathBuf::from(value))
        }
    }
}

/// One layer of options. Absent fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RunOptions {
    pub heap_size: Option<String>,
    pub runtime_flags: Option<String>,
    pub test_dir: Option<PathBuf>,
    pub run_dir: Option<PathBuf>,
    pub tests: Option<String>,
    pub artifact: Option<String>,
    pub exclude: Option<String>,
    pub runtime: Option<String>,
    pub entry_point: Option<String>,
    pub metadata: Option<PathBuf>,
    pub version_field: Option<String>,
    pub artifact_template: Option<String>,
    pub timeout_secs: Option<u64>,
    pub keep_output: Option<bool>,
}

impl RunOptions {
    /// Parses a TOML options layer.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid config file: {}", e)))
    }

    /// Reads and parses a TOML options file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Layers `higher` on top of `self`; fields set in `higher` win.
    pub fn overlay(self, higher: RunOptions) -> RunOptions {
        RunOptions {
            heap_size: higher.heap_size.or(self.heap_size),
            runtime_flags: higher.runtime_flags.or(self.runtime_flags),
            test_dir: higher.test_dir.or(self.test_dir),
            run_dir: higher.run_dir.or(self.run_dir),
            tests: higher.tests.or(self.tests),
            artifact: higher.artifact.or(self.artifact),
            exclude: higher.exclude.or(self.exclude),
            runtime: higher.runtime.or(self.runtime),
            entry_point: higher.entry_point.or(self.entry_point),
            metadata: higher.metadata.or(self.metadata),
            version_field: higher.version_field.or(self.version_field),
            artifact_template: higher.artifact_template.or(self.artifact_template),
            timeout_secs: higher.timeout_secs.or(self.timeout_secs),
            keep_output: higher.keep_output.or(self.keep_output),
        }
    }

    /// Fills remaining gaps with defaults and freezes the result.
    pub fn resolve(self) -> RunConfiguration {
        let defaults = RunConfiguration::default();
        RunConfiguration {
            heap_size: self.heap_size.unwrap_or(defaults.heap_size),
            runtime_flags: self.runtime_flags.unwrap_or(defaults.runtime_flags),
            test_dir: self.test_dir.unwrap_or(defaults.test_dir),
            run_dir: self.run_dir.unwrap_or(defaults.run_dir),
            tests_filter: self.tests.unwrap_or(defaults.tests_filter),
            artifact: self
                .artifact
                .as_deref()
                .map(ArtifactSource::parse)
                .unwrap_or(defaults.artifact),
            exclude: self.exclude.filter(|m| !m.is_empty()),
            runtime: self.runtime.unwrap_or(defaults.runtime),
            entry_point: self.entry_point.unwrap_or(defaults.entry_point),
            metadata: self.metadata.unwrap_or(defaults.metadata),
            version_field: self.version_field.unwrap_or(defaults.version_field),
            artifact_template: self.artifact_template.unwrap_or(defaults.artifact_template),
            timeout: self.timeout_secs.map(Duration::from_secs),
            keep_output: self.keep_output.unwrap_or(defaults.keep_output),
        }
    }
}

/// Fully resolved configuration for one harness run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    /// Maximum heap for each runtime process, e.g. `2G`.
    pub heap_size: String,
    /// Extra runtime flags, split on whitespace and passed through verbatim.
    pub runtime_flags: String,
    /// Directory holding the test scripts.
    pub test_dir: PathBuf,
    /// Output root, destroyed and recreated at the start of every run.
    pub run_dir: PathBuf,
    /// Comma-separated test identifiers; empty means discover all.
    pub tests_filter: String,
    /// Artifact override or the auto sentinel.
    pub artifact: ArtifactSource,
    /// Discovered files whose name contains this marker are skipped.
    pub exclude: Option<String>,
    /// Runtime executable.
    pub runtime: String,
    /// Harness entry point class handed to the runtime.
    pub entry_point: String,
    /// Project metadata file declaring the version.
    pub metadata: PathBuf,
    /// Dotted path of the version field inside the metadata.
    pub version_field: String,
    /// Artifact path template containing `{version}`.
    pub artifact_template: String,
    /// Per-test time limit. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Keep runtime stdout/stderr in the isolation directory.
    pub keep_output: bool,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            heap_size: DEFAULT_HEAP_SIZE.to_string(),
            runtime_flags: String::new(),
            test_dir: PathBuf::from(DEFAULT_TEST_DIR),
            run_dir: PathBuf::from(DEFAULT_RUN_DIR),
            tests_filter: String::new(),
            artifact: ArtifactSource::Auto,
            exclude: None,
            runtime: DEFAULT_RUNTIME.to_string(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            metadata: PathBuf::from(DEFAULT_METADATA),
            version_field: DEFAULT_VERSION_FIELD.to_string(),
            artifact_template: DEFAULT_ARTIFACT_TEMPLATE.to_string(),
            timeout: None,
            keep_output: false,
        }
    }
}

impl RunConfiguration {
    /// Sets the test directory.
    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = dir.into();
        self
    }

    /// Sets the run directory.
    pub fn with_run_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.run_dir = dir.into();
        self
    }

    /// Sets the tests filter.
    pub fn with_tests_filter(mut self, filter: impl Into<String>) -> Self {
        self.tests_filter = filter.into();
        self
    }

    /// Sets the artifact source.
    pub fn with_artifact(mut self, artifact: ArtifactSource) -> Self {
        self.artifact = artifact;
        self
    }

    /// Sets the runtime executable.
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Sets the per-test timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runtime flags as individual arguments.
    pub fn runtime_flag_args(&self) -> Vec<String> {
        self.runtime_flags
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

impl Validate for RunConfiguration {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.runtime.trim().is_empty() {
            result.add_error("runtime executable cannot be empty");
        }

        if self.entry_point.trim().is_empty() {
            result.add_error("entry point cannot be empty");
        }

        if !looks_like_memory_size(&self.heap_size) {
            result.add_warning(format!(
                "heap size '{}' does not look like a memory size such as 512m or 2G",
                self.heap_size
            ));
        }

        if self.timeout == Some(Duration::ZERO) {
            result.add_warning("timeout of 0 seconds will fail every test");
        }

        if matches!(self.artifact, ArtifactSource::Auto)
            && !self.artifact_template.contains("{version}")
        {
            result.add_warning("artifact template has no {version} placeholder");
        }

        result
    }
}

fn looks_like_memory_size(value: &str) -> bool {
    let digits = value.trim_end_matches(|c: char| matches!(c, 'k' | 'K' | 'm' | 'M' | 'g' | 'G'));
    value.len() - digits.len() <= 1
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_conventional_layout() {
        let config = RunOptions::default().resolve();

        assert_eq!(config.heap_size, "2G");
        assert_eq!(config.runtime_flags, "");
        assert_eq!(config.test_dir, PathBuf::from(DEFAULT_TEST_DIR));
        assert_eq!(config.run_dir, PathBuf::from(DEFAULT_RUN_DIR));
        assert_eq!(config.tests_filter, "");
        assert_eq!(config.artifact, ArtifactSource::Auto);
        assert_eq!(config.timeout, None);
        assert!(!config.keep_output);
    }

    #[test]
    fn artifact_sentinel_is_case_insensitive() {
        assert_eq!(ArtifactSource::parse("auto"), ArtifactSource::Auto);
        assert_eq!(ArtifactSource::parse("AUTO"), ArtifactSource::Auto);
        assert_eq!(
            ArtifactSource::parse("build/app.jar"),
            ArtifactSource::Path(PathBuf::from("build/app.jar"))
        );
    }

    #[test]
    fn higher_layer_wins() {
        let file = RunOptions {
            heap_size: Some("4G".to_string()),
            tests: Some("a.plan".to_string()),
            ..Default::default()
        };
        let cli = RunOptions {
            tests: Some("b.plan".to_string()),
            ..Default::default()
        };

        let config = file.overlay(cli).resolve();

        assert_eq!(config.heap_size, "4G");
        assert_eq!(config.tests_filter, "b.plan");
    }

    #[test]
    fn parses_toml_layer() {
        let toml = r#"
heap-size = "512m"
runtime-flags = "-ea -XX:+UseG1GC"
test-dir = "scripts"
artifact = "dist/app.jar"
timeout-secs = 600
keep-output = true
"#;
        let config = RunOptions::from_toml_str(toml).unwrap().resolve();

        assert_eq!(config.heap_size, "512m");
        assert_eq!(config.runtime_flag_args(), vec!["-ea", "-XX:+UseG1GC"]);
        assert_eq!(config.test_dir, PathBuf::from("scripts"));
        assert_eq!(
            config.artifact,
            ArtifactSource::Path(PathBuf::from("dist/app.jar"))
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(600)));
        assert!(config.keep_output);
    }

    #[test]
    fn unknown_toml_key_is_config_error() {
        let err = RunOptions::from_toml_str("heap = \"2G\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_exclude_marker_means_no_exclusion() {
        let config = RunOptions {
            exclude: Some(String::new()),
            ..Default::default()
        }
        .resolve();
        assert_eq!(config.exclude, None);
    }

    #[test]
    fn default_configuration_is_valid_without_warnings() {
        let result = RunConfiguration::default().validate();
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn odd_heap_size_warns() {
        let config = RunConfiguration {
            heap_size: "lots".to_string(),
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("heap size")));
    }

    #[test]
    fn empty_runtime_fails() {
        let config = RunConfiguration::default().with_runtime("  ");
        let err = config.validate().into_result().unwrap_err();
        assert!(err.to_string().contains("runtime"));
    }

    #[test]
    fn zero_timeout_warns() {
        let config = RunConfiguration::default().with_timeout(Duration::ZERO);
        let result = config.validate();
        assert!(result.warnings.iter().any(|w| w.contains("timeout")));
    }

    #[test]
    fn memory_size_shapes() {
        assert!(looks_like_memory_size("2G"));
        assert!(looks_like_memory_size("512m"));
        assert!(looks_like_memory_size("1048576"));
        assert!(!looks_like_memory_size("G"));
        assert!(!looks_like_memory_size("2GG"));
        assert!(!looks_like_memory_size(""));
    }
}
