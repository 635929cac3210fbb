//! Scoped removal of transient artifacts.

use parking_lot::Mutex;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Files that existed and were deleted.
    pub removed: Vec<PathBuf>,
    /// Files that were already gone.
    pub missing: Vec<PathBuf>,
    /// Files that could not be deleted, with the error text.
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    /// Returns true if every file is gone.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.removed.extend(other.removed);
        self.missing.extend(other.missing);
        self.failed.extend(other.failed);
    }
}

/// Deletes `paths` in order. Missing files are not an error.
///
/// Other failures are logged and recorded; they never stop the pass.
pub fn remove<P: AsRef<Path>>(paths: &[P]) -> CleanupReport {
    let mut report = CleanupReport::default();
    for path in paths {
        remove_one(path.as_ref(), &mut report);
    }
    report
}

fn remove_one(path: &Path, report: &mut CleanupReport) {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed");
            report.removed.push(path.to_path_buf());
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            report.missing.push(path.to_path_buf());
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not remove artifact");
            report.failed.push((path.to_path_buf(), e.to_string()));
        }
    }
}

/// Registry of paths removed in LIFO order.
#[derive(Default)]
pub struct ArtifactCleaner {
    paths: Mutex<Vec<PathBuf>>,
}

impl ArtifactCleaner {
    /// Creates a new cleaner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a path for removal.
    pub fn register(&self, path: impl Into<PathBuf>) {
        self.paths.lock().push(path.into());
    }

    /// Registers several paths for removal.
    pub fn register_all<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.lock().extend(paths.into_iter().map(Into::into));
    }

    /// Drops a registration without deleting the file.
    ///
    /// Returns true if the path was registered.
    pub fn unregister(&self, path: &Path) -> bool {
        let mut paths = self.paths.lock();
        let initial_len = paths.len();
        paths.retain(|p| p != path);
        paths.len() < initial_len
    }

    /// Returns the number of pending paths.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.paths.lock().len()
    }

    /// Removes every registered path, last registered first.
    ///
    /// The registry is empty afterwards.
    pub fn run_all(&self) -> CleanupReport {
        let paths: Vec<PathBuf> = {
            let mut lock = self.paths.lock();
            std::mem::take(&mut *lock)
        };

        let mut report = CleanupReport::default();
        for path in paths.iter().rev() {
            remove_one(path, &mut report);
        }
        report
    }
}

impl std::fmt::Debug for ArtifactCleaner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCleaner")
            .field("pending_count", &self.pending_count())
            .finish()
    }
}

/// Cleanup bound to a lexical scope.
///
/// Call `finish` on the normal way out to get the report. If the scope is left
/// any other way (early `?` return, panic, dropped future) the registered
/// paths are still removed when the guard drops.
#[derive(Debug)]
pub struct ArtifactScope {
    name: String,
    cleaner: ArtifactCleaner,
}

impl ArtifactScope {
    /// Opens a named scope.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cleaner: ArtifactCleaner::new(),
        }
    }

    /// Returns the scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a path for removal at scope exit.
    pub fn register(&self, path: impl Into<PathBuf>) {
        self.cleaner.register(path);
    }

    /// Registers several paths for removal at scope exit.
    pub fn register_all<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.cleaner.register_all(paths);
    }

    /// Keeps a registered file alive past the scope.
    pub fn keep(&self, path: &Path) -> bool {
        self.cleaner.unregister(path)
    }

    /// Returns the number of pending paths.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.cleaner.pending_count()
    }

    /// Runs the cleanup now and closes the scope.
    pub fn finish(self) -> CleanupReport {
        let report = self.cleaner.run_all();
        debug!(
            scope = %self.name,
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Cleanup finished"
        );
        report
    }
}

impl Drop for ArtifactScope {
    fn drop(&mut self) {
        if self.cleaner.pending_count() > 0 {
            warn!(scope = %self.name, "Scope left without finish, cleaning up");
            self.cleaner.run_all();
        }
    }
}
