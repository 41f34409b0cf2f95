//! Core types and configuration for diskscope.
//!
//! This crate provides the data structures shared by every other diskscope
//! crate: the flat file inventory produced by a walk, the per-folder
//! aggregates derived from it, scan and analysis configuration, and the
//! error/warning taxonomy.

mod config;
mod error;
mod inventory;
mod record;

pub use config::{AnalysisOptions, AnalysisOptionsBuilder, ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use inventory::{Inventory, aggregate_folder_sizes};
pub use record::{
    ContentHash, FileRecord, FolderRecord, NO_EXTENSION, normalize_extension, unix_seconds,
};
