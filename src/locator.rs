//! Executable Locator: finds the monitored binary once at startup.
//!
//! The configured install path is checked first. Only when it is absent does
//! the locator fall back to an [`ExecutableFinder`], normally a bounded
//! filesystem walk from the system volume root.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::TargetConfig;

/// Result of one fallback search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// First file with a matching name.
    Found(PathBuf),
    /// The whole tree was visited without a match.
    NotFound,
    /// Stopped early on the depth or time budget; unvisited parts may hold a match.
    Exhausted { visited_dirs: u64 },
}

/// Fallback search for an executable by exact file name.
pub trait ExecutableFinder: Send + Sync {
    fn find(&self, file_name: &str) -> ScanOutcome;
}

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("Executable {file_name} not found (default path {}, {reason})", .default_path.display())]
    NotFound {
        file_name: String,
        default_path: PathBuf,
        reason: &'static str,
    },
}

/// Startup-time lookup of the monitored executable.
pub struct ExecutableLocator<F> {
    file_name: String,
    default_path: Option<PathBuf>,
    finder: F,
}

impl ExecutableLocator<FilesystemScan> {
    /// Locator for the configured target using the real filesystem walk.
    pub fn from_config(target: &TargetConfig) -> Self {
        let scan = FilesystemScan::new(&target.scan_root)
            .with_max_depth(target.scan_max_depth)
            .with_time_budget(target.scan_timeout());
        Self::new(&target.process_name, Some(target.default_path.clone()), scan)
    }
}

impl<F: ExecutableFinder> ExecutableLocator<F> {
    pub fn new(file_name: &str, default_path: Option<PathBuf>, finder: F) -> Self {
        Self {
            file_name: file_name.to_string(),
            default_path,
            finder,
        }
    }

    /// Resolve the executable path.
    ///
    /// Never panics; a miss is logged and returned as [`LocateError::NotFound`].
    pub fn locate(&self) -> Result<PathBuf, LocateError> {
        if let Some(path) = self.default_path.as_deref().filter(|p| p.is_file()) {
            info!(path = %path.display(), "Executable found at default path");
            return Ok(path.to_path_buf());
        }

        info!(
            file_name = %self.file_name,
            "Executable not at default path, scanning filesystem"
        );

        let reason = match self.finder.find(&self.file_name) {
            ScanOutcome::Found(path) => {
                info!(path = %path.display(), "Executable found by scan");
                return Ok(path);
            }
            ScanOutcome::NotFound => "scan found no match",
            ScanOutcome::Exhausted { visited_dirs } => {
                warn!(visited_dirs, "Executable scan stopped on its depth/time budget");
                "scan budget exhausted"
            }
        };

        error!(file_name = %self.file_name, reason, "Could not locate the executable automatically");
        Err(LocateError::NotFound {
            file_name: self.file_name.clone(),
            default_path: self.default_path.clone().unwrap_or_default(),
            reason,
        })
    }
}

// ============================================================================
// Filesystem Scan
// ============================================================================

/// Depth-first walk from `root`, checking each directory's files before
/// descending into its subdirectories.
///
/// Symlinks are not followed and unreadable directories are skipped.
#[derive(Debug, Clone)]
pub struct FilesystemScan {
    root: PathBuf,
    max_depth: Option<usize>,
    time_budget: Option<Duration>,
}

impl FilesystemScan {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: None,
            time_budget: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    fn scan(&self, file_name: &str) -> ScanOutcome {
        let started = Instant::now();
        let mut stack: Vec<(PathBuf, usize)> = vec![(self.root.clone(), 0)];
        let mut visited_dirs: u64 = 0;
        let mut truncated = false;

        while let Some((dir, depth)) = stack.pop() {
            if self.time_budget.is_some_and(|budget| started.elapsed() >= budget) {
                return ScanOutcome::Exhausted { visited_dirs };
            }
            visited_dirs += 1;

            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            for entry in entries.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if file_type.is_file() && entry.file_name() == file_name {
                    return ScanOutcome::Found(entry.path());
                }
                if file_type.is_dir() {
                    subdirs.push(entry.path());
                }
            }

            if self.max_depth.is_some_and(|max| depth >= max) {
                truncated |= !subdirs.is_empty();
                continue;
            }
            // Reverse so the first listed subdirectory is visited first.
            stack.extend(subdirs.into_iter().rev().map(|p| (p, depth + 1)));
        }

        if truncated {
            ScanOutcome::Exhausted { visited_dirs }
        } else {
            ScanOutcome::NotFound
        }
    }
}

impl ExecutableFinder for FilesystemScan {
    fn find(&self, file_name: &str) -> ScanOutcome {
        info!(
            root = %self.root.display(),
            max_depth = ?self.max_depth,
            time_budget_secs = ?self.time_budget.map(|d| d.as_secs()),
            "Starting executable scan"
        );
        self.scan(file_name)
    }
}
