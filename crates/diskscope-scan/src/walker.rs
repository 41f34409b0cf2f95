//! JWalk-based single-pass directory walker.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, UNIX_EPOCH};

use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;

use diskscope_core::{
    FileRecord, FolderRecord, Inventory, ScanConfig, ScanError, ScanWarning, WarningKind,
    unix_seconds,
};

use crate::progress::{ProgressTracker, ScanProgress};

/// Files between two progress broadcasts.
const PROGRESS_INTERVAL: u64 = 1000;

/// Walks a directory tree exactly once and produces the flat inventory.
pub struct Walker {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Walker {
    /// Create a new walker.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to walk progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Walk the configured root and collect every stat-able regular file.
    ///
    /// Fails only when the root itself is missing, not a directory or not
    /// listable. Problems below the root are recorded as warnings.
    pub fn scan(&self, config: &ScanConfig) -> Result<Inventory, ScanError> {
        let start = Instant::now();
        let root_path = validate_root(&config.root)?;
        let ignore = build_ignore_set(&config.ignore_patterns)?;

        let mut tracker = ProgressTracker::new();
        let mut files = Vec::new();
        let mut folders = Vec::new();
        let mut warnings = Vec::new();

        for entry_result in build_walk(config, &root_path, ignore) {
            match classify(entry_result) {
                EntryOutcome::File(record) => {
                    tracker.record_file(record.size);
                    if tracker.files_scanned() % PROGRESS_INTERVAL == 0 {
                        tracker.set_current_path(record.path.clone());
                        let _ = self.progress_tx.send(tracker.snapshot());
                    }
                    files.push(record);
                }
                EntryOutcome::Folder { record, unlistable } => {
                    tracker.record_dir();
                    if let Some(folder) = record {
                        folders.push(folder);
                    }
                    if let Some(warning) = unlistable {
                        record_skip(&mut tracker, &mut warnings, warning);
                    }
                }
                EntryOutcome::Skip(warning) => record_skip(&mut tracker, &mut warnings, warning),
                EntryOutcome::Ignore => {}
            }
        }

        let _ = self.progress_tx.send(tracker.snapshot());

        let inventory = Inventory::new(
            root_path,
            files,
            folders,
            tracker.dirs_scanned(),
            start.elapsed(),
            warnings,
        );

        tracing::debug!(
            root = %inventory.root_path.display(),
            files = inventory.file_count(),
            dirs = inventory.dir_count,
            warnings = inventory.warnings.len(),
            elapsed_ms = inventory.scan_duration.as_millis() as u64,
            "walk finished"
        );

        Ok(inventory)
    }
}

impl Default for Walker {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of inspecting one walked entry.
enum EntryOutcome {
    /// A regular file that goes into the inventory.
    File(FileRecord),
    /// A directory. `record` is set for direct children of the root;
    /// `unlistable` is set when its contents could not be read, in which
    /// case the subtree is missing from the walk.
    Folder {
        record: Option<FolderRecord>,
        unlistable: Option<ScanWarning>,
    },
    /// An entry that could not be read.
    Skip(ScanWarning),
    /// The root itself, symlinks and special files.
    Ignore,
}

/// Check that the root exists, is a directory and can be listed.
fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let root_path = root.canonicalize().map_err(|e| ScanError::io(root, e))?;

    let metadata = std::fs::metadata(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory { path: root_path });
    }

    std::fs::read_dir(&root_path).map_err(|e| ScanError::io(&root_path, e))?;

    Ok(root_path)
}

/// Compile ignore patterns into a single matcher.
fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidConfig {
            message: format!("invalid ignore pattern {pattern:?}: {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::InvalidConfig {
        message: e.to_string(),
    })
}

fn build_walk(config: &ScanConfig, root_path: &Path, ignore: GlobSet) -> WalkDir {
    let parallelism = match config.threads {
        0 => Parallelism::RayonDefaultPool {
            busy_timeout: Duration::from_millis(100),
        },
        n => Parallelism::RayonNewPool(n),
    };

    WalkDir::new(root_path)
        .parallelism(parallelism)
        .skip_hidden(!config.include_hidden)
        .follow_links(config.follow_symlinks)
        .sort(true)
        .min_depth(0)
        .max_depth(config.max_depth.map(|d| d as usize).unwrap_or(usize::MAX))
        .process_read_dir(move |_depth, _path, _state, children| {
            if ignore.is_empty() {
                return;
            }
            // Pruning here keeps ignored directories from being descended into.
            children.retain(|child| match child {
                Ok(entry) => !ignore.is_match(entry.file_name()),
                Err(_) => true,
            });
        })
}

fn classify(entry_result: Result<jwalk::DirEntry<((), ())>, jwalk::Error>) -> EntryOutcome {
    let entry = match entry_result {
        Ok(e) => e,
        Err(err) => {
            let path = err.path().map(Path::to_path_buf).unwrap_or_default();
            return EntryOutcome::Skip(walk_warning(path, &err));
        }
    };

    let depth = entry.depth();
    if depth == 0 {
        return EntryOutcome::Ignore;
    }

    let file_type = entry.file_type();
    let path = entry.path();

    if file_type.is_dir() {
        let top_level = (depth == 1).then(|| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(UNIX_EPOCH);
            FolderRecord::new(path.clone(), unix_seconds(modified))
        });
        // jwalk yields an unlistable directory as `Ok` with the listing error attached.
        let unlistable = entry
            .read_children_error
            .as_ref()
            .map(|err| walk_warning(path, err));
        return EntryOutcome::Folder {
            record: top_level,
            unlistable,
        };
    }

    if !file_type.is_file() {
        return EntryOutcome::Ignore;
    }

    let metadata = match entry.metadata() {
        Ok(m) => m,
        Err(err) => return EntryOutcome::Skip(ScanWarning::metadata_error(path, err)),
    };

    let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
    let accessed = metadata.accessed().unwrap_or(modified);

    EntryOutcome::File(FileRecord::new(
        path,
        metadata.len(),
        unix_seconds(modified),
        unix_seconds(accessed),
    ))
}

fn record_skip(tracker: &mut ProgressTracker, warnings: &mut Vec<ScanWarning>, warning: ScanWarning) {
    tracing::warn!(path = %warning.path.display(), "{}", warning.message);
    tracker.record_error();
    warnings.push(warning);
}

fn walk_warning(path: PathBuf, err: &jwalk::Error) -> ScanWarning {
    match err.io_error() {
        Some(io) => io_warning(path, io),
        None => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
    }
}

/// Map an I/O failure below the root to a warning of the matching kind.
fn io_warning(path: PathBuf, err: &std::io::Error) -> ScanWarning {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        ScanWarning::permission_denied(path)
    } else {
        ScanWarning::read_error(path, err)
    }
}
