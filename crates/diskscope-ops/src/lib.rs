//! Destructive file operations for diskscope.
//!
//! These run outside a scan, on paths the caller picked from analysis
//! results. Every file is handled independently: a failure on one never
//! stops the rest, and completed deletions are never rolled back.
//!
//! Each operation has a synchronous form returning the final result and a
//! `start_*` form streaming progress through a channel.

mod archive;
mod delete;
mod operation;
mod progress;

pub use archive::{
    ArchiveFormat, ArchiveOutcome, ArchiveResult, archive_then_delete,
    archive_then_delete_with_progress, start_archive,
};
pub use delete::{DeleteOptions, DeleteResult, delete_files, delete_files_with_progress, start_delete};
pub use operation::{OperationError, OpsError};
pub use progress::{OperationComplete, OperationProgress, OperationType};

/// Default channel buffer size for operation progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
