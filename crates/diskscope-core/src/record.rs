//! File and folder record types.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Extension category assigned to files without an extension and to folders.
pub const NO_EXTENSION: &str = "no-extension";

/// BLAKE3 content fingerprint for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Convert a filesystem timestamp to whole seconds since the Unix epoch.
///
/// Times before the epoch come out negative.
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Lower-cased extension of `path` including the leading dot, or
/// [`NO_EXTENSION`] when there is none.
pub fn normalize_extension(path: &Path) -> CompactString {
    match path.extension().map(|e| e.to_string_lossy()) {
        Some(ext) if !ext.is_empty() => {
            let mut out = CompactString::with_capacity(ext.len() + 1);
            out.push('.');
            out.push_str(&ext.to_lowercase());
            out
        }
        _ => CompactString::new(NO_EXTENSION),
    }
}

fn base_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

/// One regular file discovered by a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path; unique within an inventory.
    pub path: PathBuf,

    /// Base name.
    pub name: CompactString,

    /// Size in bytes.
    pub size: u64,

    /// Last modification time, seconds since the epoch.
    pub modified: i64,

    /// Last access time, seconds since the epoch.
    pub accessed: i64,

    /// Lower-cased extension with leading dot, or [`NO_EXTENSION`].
    pub extension: CompactString,
}

impl FileRecord {
    /// Create a record, deriving name and extension from the path.
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: i64, accessed: i64) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            extension: normalize_extension(&path),
            path,
            size,
            modified,
            accessed,
        }
    }

    /// Modification time as a UTC datetime.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.modified, 0)
    }

    /// Access time as a UTC datetime.
    pub fn accessed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.accessed, 0)
    }
}

/// An immediate subfolder of the scan root with its aggregated size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    /// Absolute path of the folder.
    pub path: PathBuf,

    /// Folder name.
    pub name: CompactString,

    /// Sum of the sizes of every inventoried file beneath this folder.
    pub size: u64,

    /// Last modification time of the folder itself, seconds since the epoch.
    pub modified: i64,

    /// Always [`NO_EXTENSION`].
    pub extension: CompactString,
}

impl FolderRecord {
    /// Create a folder record with zero size; sizes are filled in by
    /// [`crate::aggregate_folder_sizes`].
    pub fn new(path: impl Into<PathBuf>, modified: i64) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            path,
            size: 0,
            modified,
            extension: CompactString::new(NO_EXTENSION),
        }
    }

    /// Modification time as a UTC datetime.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.modified, 0)
    }
}
