//! Inventory container produced by a single walk.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::ScanWarning;
use crate::record::{FileRecord, FolderRecord};

/// Complete flat result of one walk.
///
/// Built once per scan and shared read-only (usually behind an `Arc`) by
/// every analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// Root path that was scanned.
    pub root_path: PathBuf,

    /// Every stat-able regular file beneath the root.
    pub files: Vec<FileRecord>,

    /// Immediate child folders of the root, with aggregated sizes.
    pub folders: Vec<FolderRecord>,

    /// Number of directories visited below the root.
    pub dir_count: u64,

    /// When this scan was performed.
    pub scanned_at: SystemTime,

    /// Duration of the walk.
    pub scan_duration: Duration,

    /// Non-fatal problems encountered while walking.
    pub warnings: Vec<ScanWarning>,
}

impl Inventory {
    /// Create an inventory. Folder sizes are recomputed from `files`.
    pub fn new(
        root_path: PathBuf,
        files: Vec<FileRecord>,
        mut folders: Vec<FolderRecord>,
        dir_count: u64,
        scan_duration: Duration,
        warnings: Vec<ScanWarning>,
    ) -> Self {
        aggregate_folder_sizes(&root_path, &files, &mut folders);
        Self {
            root_path,
            files,
            folders,
            dir_count,
            scanned_at: SystemTime::now(),
            scan_duration,
            warnings,
        }
    }

    /// Inventory holding only files, with no folders or warnings.
    pub fn from_files(root_path: impl Into<PathBuf>, files: Vec<FileRecord>) -> Self {
        Self::new(
            root_path.into(),
            files,
            Vec::new(),
            0,
            Duration::ZERO,
            Vec::new(),
        )
    }

    /// Number of files in the inventory.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Sum of all file sizes.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Check if the inventory holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files whose parent directory is the root itself.
    pub fn root_files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files
            .iter()
            .filter(|f| f.path.parent() == Some(self.root_path.as_path()))
    }

    /// Look up a file by path.
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Check if there were any warnings during the walk.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Fill in each folder's size as the sum of the files beneath it.
///
/// Every file is attributed to the root child named by the first component
/// of its root-relative path, so the inventory is traversed once regardless
/// of how many folders there are.
pub fn aggregate_folder_sizes(root: &Path, files: &[FileRecord], folders: &mut [FolderRecord]) {
    let mut sizes: HashMap<OsString, u64> = HashMap::new();

    for file in files {
        let Ok(relative) = file.path.strip_prefix(root) else {
            continue;
        };
        let mut components = relative.components();
        let first = components.next();
        // Files directly under the root belong to no folder.
        if components.next().is_none() {
            continue;
        }
        if let Some(Component::Normal(name)) = first {
            *sizes.entry(name.to_os_string()).or_default() += file.size;
        }
    }

    for folder in folders.iter_mut() {
        folder.size = folder
            .path
            .file_name()
            .and_then(|name| sizes.get(name))
            .copied()
            .unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_files() -> Vec<FileRecord> {
        vec![
            FileRecord::new("/root/a.txt", 10, 0, 0),
            FileRecord::new("/root/docs/b.txt", 20, 0, 0),
            FileRecord::new("/root/docs/deep/c.txt", 30, 0, 0),
            FileRecord::new("/root/media/d.mp4", 40, 0, 0),
            FileRecord::new("/root/docsx/e.txt", 5, 0, 0),
        ]
    }

    #[test]
    fn test_folder_sizes_sum_descendants() {
        let mut folders = vec![
            FolderRecord::new("/root/docs", 0),
            FolderRecord::new("/root/media", 0),
            FolderRecord::new("/root/docsx", 0),
            FolderRecord::new("/root/empty", 0),
        ];
        aggregate_folder_sizes(Path::new("/root"), &sample_files(), &mut folders);

        assert_eq!(folders[0].size, 50);
        assert_eq!(folders[1].size, 40);
        // Sibling sharing a name prefix is not counted in "docs".
        assert_eq!(folders[2].size, 5);
        assert_eq!(folders[3].size, 0);
    }

    #[test]
    fn test_inventory_totals() {
        let inventory = Inventory::from_files("/root", sample_files());
        assert_eq!(inventory.file_count(), 5);
        assert_eq!(inventory.total_size(), 105);
        assert!(!inventory.is_empty());
        assert!(!inventory.has_warnings());
    }

    #[test]
    fn test_root_files() {
        let inventory = Inventory::from_files("/root", sample_files());
        let names: Vec<_> = inventory.root_files().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt"]);
    }
}
