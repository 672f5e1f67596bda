//! Run directory management.
//!
//! The run directory is regenerated on every run: whatever a previous run
//! left behind is deleted before the first test starts. Each test then gets
//! its own isolation subdirectory, so no two runtime processes share files.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// File receiving runtime stdout when output is kept.
pub const STDOUT_LOG: &str = "stdout.log";
/// File receiving runtime stderr when output is kept.
pub const STDERR_LOG: &str = "stderr.log";

/// A freshly emptied run directory.
#[derive(Debug, Clone)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    /// Destroys anything at `root` and recreates it empty.
    ///
    /// This discards all artifacts of the previous run.
    pub fn prepare(root: &Path) -> Result<Self> {
        if root.exists() {
            tracing::warn!(run_dir = ?root, "discarding previous run directory");
            let removed = if root.is_dir() {
                std::fs::remove_dir_all(root)
            } else {
                std::fs::remove_file(root)
            };
            removed.map_err(|source| Error::DirectoryCreation {
                path: root.to_path_buf(),
                source,
            })?;
        }

        std::fs::create_dir_all(root).map_err(|source| Error::DirectoryCreation {
            path: root.to_path_buf(),
            source,
        })?;

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the run directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the isolation subdirectory for one test.
    ///
    /// The identifier must be a relative path that stays below the run
    /// directory; anything else is a `DirectoryCreation` error.
    pub fn isolate(&self, test_id: &str) -> Result<IsolationDir> {
        let path = self.root.join(test_id);
        if !is_confined(Path::new(test_id)) {
            return Err(Error::DirectoryCreation {
                path,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("test identifier '{}' escapes the run directory", test_id),
                ),
            });
        }
        std::fs::create_dir_all(&path).map_err(|source| Error::DirectoryCreation {
            path: path.clone(),
            source,
        })?;
        Ok(IsolationDir { path })
    }
}

/// Refuses a run directory that would delete, or be discovered among, the
/// run's own inputs.
///
/// `inputs` must exist. A run directory that does not exist yet contains
/// nothing and always passes.
pub fn ensure_disjoint(root: &Path, test_dir: &Path, inputs: &[&Path]) -> Result<()> {
    let Ok(root) = std::fs::canonicalize(root) else {
        return Ok(());
    };
    let canonical = |path: &Path| {
        std::fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("cannot resolve {}: {}", path.display(), e))
        })
    };

    let test_dir = canonical(test_dir)?;
    if root.starts_with(&test_dir) {
        return Err(Error::Config(format!(
            "run directory {} is inside the test directory {}",
            root.display(),
            test_dir.display()
        )));
    }

    for input in std::iter::once(test_dir.as_path()).chain(inputs.iter().copied()) {
        let input = canonical(input)?;
        if input.starts_with(&root) {
            return Err(Error::Config(format!(
                "run directory {} contains {}, which would be deleted",
                root.display(),
                input.display()
            )));
        }
    }
    Ok(())
}

/// True if `id` is non-empty and has only normal (or `.`) components.
fn is_confined(id: &Path) -> bool {
    let mut normal = false;
    for component in id.components() {
        match component {
            Component::Normal(_) => normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    normal
}

/// Per-test directory used for both data and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationDir {
    path: PathBuf,
}

impl IsolationDir {
    /// Directory the runtime writes its data files to.
    pub fn data_path(&self) -> &Path {
        &self.path
    }

    /// Directory the runtime writes its logs to. Same as the data path.
    pub fn log_path(&self) -> &Path {
        &self.path
    }

    /// Path of the kept stdout log.
    pub fn stdout_log(&self) -> PathBuf {
        self.path.join(STDOUT_LOG)
    }

    /// Path of the kept stderr log.
    pub fn stderr_log(&self) -> PathBuf {
        self.path.join(STDERR_LOG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prepare_creates_missing_parents() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("target").join("stress");

        let run_dir = RunDirectory::prepare(&root).unwrap();

        assert!(run_dir.root().is_dir());
    }

    #[test]
    fn prepare_discards_previous_contents() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("run");
        std::fs::create_dir_all(root.join("old.plan")).unwrap();
        std::fs::write(root.join("old.plan").join("journal.000001"), b"x").unwrap();
        std::fs::write(root.join("stray.txt"), b"x").unwrap();

        RunDirectory::prepare(&root).unwrap();

        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn prepare_replaces_file_at_root() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("run");
        std::fs::write(&root, b"not a directory").unwrap();

        RunDirectory::prepare(&root).unwrap();

        assert!(root.is_dir());
    }

    #[test]
    fn isolate_shares_data_and_log_path() {
        let base = TempDir::new().unwrap();
        let run_dir = RunDirectory::prepare(&base.path().join("run")).unwrap();

        let iso = run_dir.isolate("x.plan").unwrap();

        assert!(iso.data_path().is_dir());
        assert_eq!(iso.data_path(), iso.log_path());
        assert_eq!(iso.data_path(), run_dir.root().join("x.plan"));
        assert_eq!(iso.stdout_log(), run_dir.root().join("x.plan").join(STDOUT_LOG));
    }

    #[test]
    fn isolate_nested_identifier() {
        let base = TempDir::new().unwrap();
        let run_dir = RunDirectory::prepare(&base.path().join("run")).unwrap();

        let iso = run_dir.isolate("txn/mixture.plan").unwrap();

        assert!(iso.data_path().ends_with("txn/mixture.plan"));
        assert!(iso.data_path().is_dir());
    }

    #[test]
    fn isolate_rejects_parent_traversal() {
        let base = TempDir::new().unwrap();
        let run_dir = RunDirectory::prepare(&base.path().join("run")).unwrap();

        let err = run_dir.isolate("../escaped.plan").unwrap_err();

        assert!(matches!(err, Error::DirectoryCreation { .. }));
        assert!(!base.path().join("escaped.plan").exists());
    }

    #[test]
    fn isolate_rejects_absolute_identifier() {
        let base = TempDir::new().unwrap();
        let run_dir = RunDirectory::prepare(&base.path().join("run")).unwrap();
        let outside = base.path().join("outside.plan");

        let err = run_dir.isolate(outside.to_str().unwrap()).unwrap_err();

        assert!(matches!(err, Error::DirectoryCreation { .. }));
        assert!(!outside.exists());
    }

    #[test]
    fn isolate_rejects_nested_traversal() {
        let base = TempDir::new().unwrap();
        let run_dir = RunDirectory::prepare(&base.path().join("run")).unwrap();

        assert!(run_dir.isolate("txn/../../escaped.plan").is_err());
        assert!(run_dir.isolate(".").is_err());
        assert!(run_dir.isolate("./ok.plan").is_ok());
    }

    #[test]
    fn prepare_fails_when_parent_is_file() {
        let base = TempDir::new().unwrap();
        let blocker = base.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let err = RunDirectory::prepare(&blocker.join("run")).unwrap_err();

        assert!(matches!(
            err,
            Error::DirectoryCreation { ref path, .. } if path.ends_with("blocker/run")
        ));
    }

    #[test]
    fn disjoint_accepts_sibling_directories() {
        let base = TempDir::new().unwrap();
        let tests = base.path().join("tscripts");
        let run = base.path().join("run");
        std::fs::create_dir_all(&tests).unwrap();
        std::fs::create_dir_all(&run).unwrap();
        let jar = base.path().join("app.jar");
        std::fs::write(&jar, b"PK").unwrap();

        ensure_disjoint(&run, &tests, &[&jar]).unwrap();
    }

    #[test]
    fn disjoint_accepts_missing_run_dir() {
        let base = TempDir::new().unwrap();

        ensure_disjoint(&base.path().join("run"), base.path(), &[]).unwrap();
    }

    #[test]
    fn disjoint_rejects_run_dir_containing_inputs() {
        let base = TempDir::new().unwrap();
        let tests = base.path().join("tscripts");
        std::fs::create_dir_all(&tests).unwrap();
        let jar = base.path().join("target").join("app.jar");
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        std::fs::write(&jar, b"PK").unwrap();

        let err = ensure_disjoint(base.path(), &tests, &[&jar]).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("would be deleted")));

        let target = base.path().join("target");
        let err = ensure_disjoint(&target, &tests, &[&jar]).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("app.jar")));
    }

    #[test]
    fn disjoint_rejects_run_dir_equal_to_or_inside_test_dir() {
        let base = TempDir::new().unwrap();
        let nested = base.path().join("run");
        std::fs::create_dir_all(&nested).unwrap();

        assert!(matches!(
            ensure_disjoint(base.path(), base.path(), &[]),
            Err(Error::Config(_))
        ));
        let err = ensure_disjoint(&nested, base.path(), &[]).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("inside the test directory")));
    }

    #[test]
    fn isolate_fails_when_blocked_by_file() {
        let base = TempDir::new().unwrap();
        let run_dir = RunDirectory::prepare(&base.path().join("run")).unwrap();
        std::fs::write(run_dir.root().join("blocker"), b"x").unwrap();

        let err = run_dir.isolate("blocker/a.plan").unwrap_err();

        assert!(matches!(err, Error::DirectoryCreation { .. }));
    }
}
