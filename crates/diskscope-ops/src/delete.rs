//! Best-effort bulk deletion.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::progress::{OperationComplete, OperationProgress, OperationType};
use crate::{OPERATION_CHANNEL_SIZE, OperationError};

/// Result sent through the channel during a delete operation.
#[derive(Debug)]
pub enum DeleteResult {
    /// Progress update.
    Progress(OperationProgress),
    /// The operation completed.
    Complete(OperationComplete),
}

/// Options for delete operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Move to the platform trash instead of removing permanently.
    pub use_trash: bool,
}

impl DeleteOptions {
    /// Send files to the trash.
    pub fn trash() -> Self {
        Self { use_trash: true }
    }

    fn operation_type(self) -> OperationType {
        if self.use_trash {
            OperationType::Trash
        } else {
            OperationType::Delete
        }
    }
}

/// Delete every path, continuing past failures.
///
/// A path that no longer exists is counted as a failure; nothing is rolled
/// back.
pub fn delete_files(paths: &[PathBuf], options: DeleteOptions) -> OperationComplete {
    delete_files_with_progress(paths, options, |_| {})
}

/// Delete every path, reporting progress before and after each file.
pub fn delete_files_with_progress<F>(
    paths: &[PathBuf],
    options: DeleteOptions,
    mut on_progress: F,
) -> OperationComplete
where
    F: FnMut(&OperationProgress),
{
    let mut progress = OperationProgress::new(options.operation_type(), paths.len());

    for path in paths {
        progress.set_current_file(Some(path.clone()));
        on_progress(&progress);

        match remove_path(path, options) {
            Ok(bytes) => progress.complete_file(bytes),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "delete failed");
                progress.add_error(OperationError::new(path.clone(), err));
            }
        }
    }

    progress.set_current_file(None);
    on_progress(&progress);

    let complete = progress.finish();
    tracing::info!(
        succeeded = complete.succeeded,
        failed = complete.failed,
        bytes = complete.bytes_processed,
        "{}",
        complete.summary()
    );
    complete
}

/// Start an async delete operation.
///
/// Returns a receiver for progress updates and the final result.
pub fn start_delete(paths: Vec<PathBuf>, options: DeleteOptions) -> mpsc::Receiver<DeleteResult> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    if paths.is_empty() {
        let complete = OperationComplete::empty(options.operation_type());
        tokio::spawn(async move {
            let _ = tx.send(DeleteResult::Complete(complete)).await;
        });
        return rx;
    }

    tokio::task::spawn_blocking(move || {
        let complete = delete_files_with_progress(&paths, options, |progress| {
            let _ = tx.blocking_send(DeleteResult::Progress(progress.clone()));
        });
        let _ = tx.blocking_send(DeleteResult::Complete(complete));
    });

    rx
}

/// Remove one path, returning the number of bytes it occupied.
fn remove_path(path: &Path, options: DeleteOptions) -> Result<u64, String> {
    let metadata = fs::symlink_metadata(path).map_err(|e| describe(&e))?;
    let bytes = if metadata.is_file() { metadata.len() } else { 0 };

    if options.use_trash {
        trash::delete(path).map_err(|e| format!("trash error: {e}"))?;
    } else if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| describe(&e))?;
    } else {
        fs::remove_file(path).map_err(|e| describe(&e))?;
    }

    Ok(bytes)
}

fn describe(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "no longer exists".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_delete_reports_missing_as_failure() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("present.txt");
        let missing = temp.path().join("missing.txt");
        fs::write(&present, "12345").unwrap();

        let complete = delete_files(&[present.clone(), missing.clone()], DeleteOptions::default());

        assert_eq!(complete.succeeded, 1);
        assert_eq!(complete.failed, 1);
        assert_eq!(complete.bytes_processed, 5);
        assert_eq!(complete.errors[0].path, missing);
        assert_eq!(complete.errors[0].message, "no longer exists");
        assert!(!present.exists());
    }

    #[test]
    fn test_delete_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        fs::create_dir_all(dir.join("inner")).unwrap();
        fs::write(dir.join("inner/file"), "x").unwrap();

        let complete = delete_files(&[dir.clone()], DeleteOptions::default());

        assert!(complete.is_success());
        assert!(!dir.exists());
    }

    #[test]
    fn test_progress_callback_sees_every_file() {
        let temp = TempDir::new().unwrap();
        let paths: Vec<_> = (0..3)
            .map(|i| {
                let p = temp.path().join(format!("{i}.txt"));
                fs::write(&p, "x").unwrap();
                p
            })
            .collect();

        let mut seen = Vec::new();
        delete_files_with_progress(&paths, DeleteOptions::default(), |p| {
            seen.push(p.current_file.clone());
        });

        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], Some(paths[0].clone()));
        assert_eq!(seen[3], None);
    }
}
