//! Analyzers over a diskscope inventory.
//!
//! Every analyzer reads a shared, frozen [`Inventory`]; none of them
//! modify it. Only duplicate detection touches the disk again.
//!
//! - **Summary** - file count, total and average size
//! - **Duplicates** - files with identical size and sampled fingerprint
//! - **Stale files** - files not accessed within a number of days
//! - **Largest files** - top-N ranking by size
//! - **Space breakdown** - root-level folders and files by size
//! - **Filters** - path text, size range and extension categories
//!
//! # Duplicate Detection
//!
//! ```rust,no_run
//! use diskscope_analyze::DuplicateFinder;
//! use diskscope_scan::{ScanConfig, Walker};
//!
//! let inventory = Walker::new().scan(&ScanConfig::new("/path/to/scan")).unwrap();
//!
//! let report = DuplicateFinder::new().find_duplicates(&inventory);
//!
//! println!("Found {} duplicate groups", report.group_count);
//! println!("Wasted space: {} bytes", report.total_wasted_space);
//! ```
//!
//! # Stale Files
//!
//! ```rust,no_run
//! use diskscope_analyze::StaleFinder;
//! use diskscope_scan::{ScanConfig, Walker};
//!
//! let inventory = Walker::new().scan(&ScanConfig::new("/path/to/scan")).unwrap();
//!
//! for entry in StaleFinder::new(180).find(&inventory).files {
//!     println!("{} ({} bytes)", entry.path.display(), entry.size);
//! }
//! ```

mod breakdown;
mod duplicates;
mod filter;
pub mod hasher;
mod largest;
mod stale;
mod summary;

pub use breakdown::{DEFAULT_SLICES, OTHER_LABEL, SpaceBreakdown, SpaceSlice, space_breakdown};
pub use duplicates::{
    DuplicateConfig, DuplicateConfigBuilder, DuplicateFinder, DuplicateGroup, DuplicateReport,
    HashProgress,
};
pub use filter::{FileCategory, InventoryFilter};
pub use hasher::fingerprint;
pub use largest::{TopFileEntry, largest_files};
pub use stale::{StaleConfig, StaleConfigBuilder, StaleFileEntry, StaleFinder, StaleReport, format_age};
pub use summary::{ScanSummary, summarize};

pub use diskscope_core::{ContentHash, FileRecord, Inventory};
