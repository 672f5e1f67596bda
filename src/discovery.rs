//! Test discovery.
//!
//! An explicit filter is taken literally. Otherwise every regular file under
//! the test directory is a test, identified by its path relative to that
//! directory.

use std::path::Path;

use walkdir::WalkDir;

use crate::config::RunConfiguration;
use crate::error::{Error, Result};

/// Delimiter between identifiers in an explicit filter.
pub const FILTER_DELIMITER: char = ',';

/// Produces the ordered list of test identifiers for a run.
pub fn discover(config: &RunConfiguration) -> Result<Vec<String>> {
    let test_dir = &config.test_dir;
    if !test_dir.is_dir() {
        return Err(Error::Config(format!(
            "test directory does not exist: {}",
            test_dir.display()
        )));
    }

    if !config.tests_filter.trim().is_empty() {
        let tests = parse_filter(&config.tests_filter);
        tracing::debug!(count = tests.len(), "using explicit test list");
        return Ok(tests);
    }

    let tests = walk(test_dir, config.exclude.as_deref())?;
    tracing::debug!(count = tests.len(), test_dir = ?test_dir, "discovered tests");
    Ok(tests)
}

/// Splits an explicit filter into identifiers, preserving order and duplicates.
pub fn parse_filter(filter: &str) -> Vec<String> {
    filter
        .split(FILTER_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collects regular files under `root`, sorted by file name within each directory.
fn walk(root: &Path, exclude: Option<&str>) -> Result<Vec<String>> {
    let mut tests = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::Config(format!(
                "cannot read test directory {}: {}",
                root.display(),
                e
            ))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        // Identifiers are passed to the runtime as text, so the name must round-trip.
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        let Some(parts) = parts else {
            tracing::warn!(path = ?entry.path(), "skipping test with a non-UTF-8 name");
            continue;
        };
        let id = parts.join("/");

        if let Some(marker) = exclude {
            if id.contains(marker) {
                tracing::debug!(test = %id, marker = %marker, "excluded test");
                continue;
            }
        }

        tests.push(id);
    }

    Ok(tests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(dir: &Path) -> RunConfiguration {
        RunConfiguration::default().with_test_dir(dir)
    }

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "# plan\n").unwrap();
    }

    #[test]
    fn explicit_filter_keeps_order_regardless_of_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "z.plan");

        let tests = discover(&config_for(dir.path()).with_tests_filter("a,b,c")).unwrap();

        assert_eq!(tests, vec!["a", "b", "c"]);
    }

    #[test]
    fn explicit_filter_keeps_duplicates() {
        assert_eq!(parse_filter("b,a,b"), vec!["b", "a", "b"]);
    }

    #[test]
    fn explicit_filter_drops_empty_segments() {
        assert_eq!(parse_filter(" a , ,b,"), vec!["a", "b"]);
    }

    #[test]
    fn walks_sorted_and_recursive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "y.plan");
        touch(dir.path(), "x.plan");
        touch(dir.path(), "nested/a.plan");

        let tests = discover(&config_for(dir.path())).unwrap();

        assert_eq!(tests, vec!["nested/a.plan", "x.plan", "y.plan"]);
    }

    #[test]
    fn empty_directory_yields_no_tests() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("empty-subdir")).unwrap();

        let tests = discover(&config_for(dir.path())).unwrap();

        assert!(tests.is_empty());
    }

    #[test]
    fn exclusion_marker_skips_discovered_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "insert.plan");
        touch(dir.path(), "insert_slow.plan");

        let mut config = config_for(dir.path());
        config.exclude = Some("_slow".to_string());

        assert_eq!(discover(&config).unwrap(), vec!["insert.plan"]);
    }

    #[test]
    fn exclusion_marker_ignores_explicit_list() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(dir.path()).with_tests_filter("insert_slow.plan");
        config.exclude = Some("_slow".to_string());

        assert_eq!(discover(&config).unwrap(), vec!["insert_slow.plan"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ok.plan");
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.plan")), "# plan\n").unwrap();
        std::fs::create_dir(dir.path().join(OsStr::from_bytes(b"sub\xfe"))).unwrap();
        touch(&dir.path().join(OsStr::from_bytes(b"sub\xfe")), "inner.plan");

        assert_eq!(discover(&config_for(dir.path())).unwrap(), vec!["ok.plan"]);
    }

    #[test]
    fn missing_test_dir_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir.path().join("missing")).with_tests_filter("a");

        let err = discover(&config).unwrap_err();

        assert!(matches!(err, Error::Config(ref m) if m.contains("test directory")));
    }
}
