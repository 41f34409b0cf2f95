//! Directory walker for diskscope.
//!
//! `diskscope-scan` performs exactly one parallel traversal of a root
//! directory (via jwalk) and produces a flat [`Inventory`] of every
//! stat-able regular file, plus size aggregates for the root's immediate
//! subfolders. Every analysis downstream reads this one inventory, so the
//! disk is never walked twice for the same scan.
//!
//! # Example
//!
//! ```rust,no_run
//! use diskscope_scan::{ScanConfig, Walker};
//!
//! let inventory = Walker::new().scan(&ScanConfig::new("/path/to/scan")).unwrap();
//!
//! println!("{} files, {} bytes", inventory.file_count(), inventory.total_size());
//! for folder in &inventory.folders {
//!     println!("{}: {} bytes", folder.name, folder.size);
//! }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use diskscope_scan::Walker;
//!
//! let walker = Walker::new();
//! let mut progress_rx = walker.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//! ```

mod progress;
mod walker;

pub use progress::ScanProgress;
pub use walker::Walker;

// Re-export core types for convenience
pub use diskscope_core::{
    FileRecord, FolderRecord, Inventory, ScanConfig, ScanError, ScanWarning, WarningKind,
};
