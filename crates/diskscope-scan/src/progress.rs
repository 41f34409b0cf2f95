//! Walk progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Progress information during a walk.
///
/// The total number of entries is not known up front, so consumers should
/// render this as indeterminate progress.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Number of files inventoried so far.
    pub files_scanned: u64,
    /// Number of directories visited so far.
    pub dirs_scanned: u64,
    /// Total bytes inventoried so far.
    pub bytes_scanned: u64,
    /// Most recently inventoried path.
    pub current_path: PathBuf,
    /// Number of entries skipped with a warning.
    pub errors_count: u64,
    /// Time elapsed since the walk started.
    pub elapsed: Duration,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files inventoried per second of walk time.
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files_scanned as f64 / secs
        } else {
            0.0
        }
    }

    /// Files plus directories visited.
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}

/// Running counters kept by the walker; `snapshot` stamps the elapsed time.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    started: Instant,
    current: ScanProgress,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            current: ScanProgress::default(),
        }
    }

    pub fn record_file(&mut self, size: u64) {
        self.current.files_scanned += 1;
        self.current.bytes_scanned += size;
    }

    pub fn record_dir(&mut self) {
        self.current.dirs_scanned += 1;
    }

    pub fn record_error(&mut self) {
        self.current.errors_count += 1;
    }

    pub fn set_current_path(&mut self, path: PathBuf) {
        self.current.current_path = path;
    }

    pub fn files_scanned(&self) -> u64 {
        self.current.files_scanned
    }

    pub fn dirs_scanned(&self) -> u64 {
        self.current.dirs_scanned
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            elapsed: self.started.elapsed(),
            ..self.current.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_snapshot() {
        let mut tracker = ProgressTracker::new();
        tracker.record_file(100);
        tracker.record_file(50);
        tracker.record_dir();
        tracker.record_error();
        tracker.set_current_path(PathBuf::from("/x/y"));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.files_scanned, 2);
        assert_eq!(snapshot.bytes_scanned, 150);
        assert_eq!(snapshot.dirs_scanned, 1);
        assert_eq!(snapshot.errors_count, 1);
        assert_eq!(snapshot.total_items(), 3);
        assert_eq!(snapshot.current_path, PathBuf::from("/x/y"));
    }

    #[test]
    fn test_rate_with_zero_elapsed() {
        let progress = ScanProgress::new();
        assert_eq!(progress.files_per_second(), 0.0);
    }
}
