//! Duplicate file detection using sampled content fingerprints.
//!
//! Two phases:
//! 1. Bucket candidate files by exact size (no I/O)
//! 2. Fingerprint every file in a bucket of two or more, in parallel, and
//!    sub-bucket by digest
//!
//! Files whose size is unique can never have a duplicate and are never read.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use derive_builder::Builder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use diskscope_core::{ContentHash, FileRecord, Inventory, ScanWarning};

use crate::hasher::{self, SAMPLE_SIZE, WHOLE_FILE_LIMIT};

/// Files between two hashing progress callbacks.
const HASH_PROGRESS_INTERVAL: u64 = 100;

/// Configuration for duplicate detection.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct DuplicateConfig {
    /// Files at or below this size are ignored.
    #[builder(default = "1024")]
    pub min_size: u64,

    /// Maximum number of groups to return (0 = unlimited).
    #[builder(default = "0")]
    pub max_groups: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_size: 1024,
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }
}

/// A group of files sharing the same size and fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Fingerprint shared by all files in this group.
    pub hash: ContentHash,

    /// Size of each file in bytes.
    pub size: u64,

    /// Sorted paths of all members; at least two.
    pub paths: Vec<PathBuf>,

    /// Wasted space: size * (count - 1).
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Number of members that could go while keeping one copy.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups ordered by wasted space, then size, then first path.
    pub groups: Vec<DuplicateGroup>,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Number of files that were fingerprinted.
    pub files_analyzed: u64,

    /// Number of files that belong to some group.
    pub files_with_duplicates: u64,

    /// Number of groups reported.
    pub group_count: usize,

    /// Candidates that could not be read; left out of every group.
    pub unreadable: Vec<ScanWarning>,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Get total number of duplicate files across all groups.
    pub fn total_duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.paths.len()).sum()
    }
}

/// Progress information during fingerprinting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashProgress {
    /// Files processed so far.
    pub files_processed: u64,
    /// Total files to process.
    pub total_files: u64,
    /// Bytes read so far.
    pub bytes_hashed: u64,
    /// File most recently processed.
    pub current_file: Option<PathBuf>,
}

/// Duplicate file finder.
pub struct DuplicateFinder {
    config: DuplicateConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with default config.
    pub fn new() -> Self {
        Self {
            config: DuplicateConfig::default(),
        }
    }

    /// Create a new duplicate finder with custom config.
    pub fn with_config(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// Find duplicates in an inventory.
    pub fn find_duplicates(&self, inventory: &Inventory) -> DuplicateReport {
        self.find_duplicates_with_progress(inventory, |_| {})
    }

    /// Find duplicates, reporting fingerprinting progress to `on_progress`.
    ///
    /// The callback runs on rayon worker threads.
    pub fn find_duplicates_with_progress<F>(
        &self,
        inventory: &Inventory,
        on_progress: F,
    ) -> DuplicateReport
    where
        F: Fn(HashProgress) + Sync,
    {
        let start = Instant::now();

        let candidates: Vec<&FileRecord> = self
            .group_by_size(inventory)
            .into_values()
            .flatten()
            .collect();
        let total_files = candidates.len() as u64;

        let processed = AtomicU64::new(0);
        let bytes = AtomicU64::new(0);

        let hashed: Vec<(&FileRecord, std::io::Result<ContentHash>)> = candidates
            .par_iter()
            .map(|record| {
                let result = hasher::fingerprint(&record.path);

                let read = if record.size < WHOLE_FILE_LIMIT {
                    record.size
                } else {
                    2 * SAMPLE_SIZE
                };
                bytes.fetch_add(read, Ordering::SeqCst);
                let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                if done % HASH_PROGRESS_INTERVAL == 0 || done == total_files {
                    on_progress(HashProgress {
                        files_processed: done,
                        total_files,
                        bytes_hashed: bytes.load(Ordering::SeqCst),
                        current_file: Some(record.path.clone()),
                    });
                }

                (*record, result)
            })
            .collect();

        let mut by_digest: BTreeMap<(u64, ContentHash), Vec<PathBuf>> = BTreeMap::new();
        let mut unreadable = Vec::new();

        for (record, result) in hashed {
            match result {
                Ok(hash) => by_digest
                    .entry((record.size, hash))
                    .or_default()
                    .push(record.path.clone()),
                Err(err) => {
                    tracing::warn!(path = %record.path.display(), error = %err, "could not fingerprint");
                    unreadable.push(ScanWarning::hash_failure(&record.path, &err));
                }
            }
        }

        let mut groups: Vec<DuplicateGroup> = by_digest
            .into_iter()
            .filter(|(_, paths)| paths.len() >= 2)
            .map(|((size, hash), mut paths)| {
                paths.sort();
                DuplicateGroup {
                    hash,
                    size,
                    wasted_bytes: size * (paths.len() as u64 - 1),
                    paths,
                }
            })
            .collect();

        groups.sort_by(|a, b| {
            b.wasted_bytes
                .cmp(&a.wasted_bytes)
                .then_with(|| b.size.cmp(&a.size))
                .then_with(|| a.paths.first().cmp(&b.paths.first()))
        });

        if self.config.max_groups > 0 && groups.len() > self.config.max_groups {
            groups.truncate(self.config.max_groups);
        }

        unreadable.sort_by(|a, b| a.path.cmp(&b.path));

        let total_wasted_space = groups.iter().map(|g| g.wasted_bytes).sum();
        let files_with_duplicates = groups.iter().map(|g| g.paths.len() as u64).sum();
        let group_count = groups.len();

        tracing::debug!(
            candidates = total_files,
            groups = group_count,
            unreadable = unreadable.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "duplicate detection finished"
        );

        DuplicateReport {
            groups,
            total_wasted_space,
            files_analyzed: total_files,
            files_with_duplicates,
            group_count,
            unreadable,
        }
    }

    /// Bucket candidate files by size, keeping only buckets of two or more.
    fn group_by_size<'a>(&self, inventory: &'a Inventory) -> BTreeMap<u64, Vec<&'a FileRecord>> {
        let mut groups: BTreeMap<u64, Vec<&FileRecord>> = BTreeMap::new();
        for file in inventory.files.iter().filter(|f| f.size > self.config.min_size) {
            groups.entry(file.size).or_default().push(file);
        }
        groups.retain(|_, v| v.len() > 1);
        groups
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn record(path: &Path) -> FileRecord {
        let size = fs::metadata(path).unwrap().len();
        FileRecord::new(path, size, 0, 0)
    }

    fn inventory_of(root: &Path, names: &[&str]) -> Inventory {
        let files = names.iter().map(|n| record(&root.join(n))).collect();
        Inventory::from_files(root, files)
    }

    #[test]
    fn test_groups_sorted_and_ordered() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("c.bin"), vec![1u8; 2000]).unwrap();
        fs::write(root.join("a.bin"), vec![1u8; 2000]).unwrap();
        fs::write(root.join("x.bin"), vec![2u8; 5000]).unwrap();
        fs::write(root.join("y.bin"), vec![2u8; 5000]).unwrap();
        fs::write(root.join("solo.bin"), vec![3u8; 5000]).unwrap();

        let inventory = inventory_of(root, &["c.bin", "a.bin", "x.bin", "y.bin", "solo.bin"]);
        let report = DuplicateFinder::new().find_duplicates(&inventory);

        assert_eq!(report.group_count, 2);
        assert_eq!(report.groups[0].size, 5000);
        assert_eq!(report.groups[0].paths, vec![root.join("x.bin"), root.join("y.bin")]);
        assert_eq!(report.groups[1].paths, vec![root.join("a.bin"), root.join("c.bin")]);
        assert_eq!(report.total_wasted_space, 5000 + 2000);
        assert_eq!(report.files_analyzed, 5);
        assert_eq!(report.files_with_duplicates, 4);
    }

    #[test]
    fn test_min_size_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.bin"), vec![0u8; 1024]).unwrap();
        fs::write(root.join("b.bin"), vec![0u8; 1024]).unwrap();

        let inventory = inventory_of(root, &["a.bin", "b.bin"]);
        let report = DuplicateFinder::new().find_duplicates(&inventory);

        assert!(!report.has_duplicates());
        assert_eq!(report.files_analyzed, 0);
    }

    #[test]
    fn test_unreadable_candidate_listed() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.bin"), vec![5u8; 3000]).unwrap();
        fs::write(root.join("b.bin"), vec![5u8; 3000]).unwrap();
        fs::write(root.join("c.bin"), vec![5u8; 3000]).unwrap();

        let inventory = inventory_of(root, &["a.bin", "b.bin", "c.bin"]);
        fs::remove_file(root.join("b.bin")).unwrap();

        let report = DuplicateFinder::new().find_duplicates(&inventory);

        assert_eq!(report.group_count, 1);
        assert_eq!(report.groups[0].paths, vec![root.join("a.bin"), root.join("c.bin")]);
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.unreadable[0].path, root.join("b.bin"));
    }

    #[test]
    fn test_max_groups() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for (i, size) in [2000usize, 3000, 4000].iter().enumerate() {
            fs::write(root.join(format!("{i}a.bin")), vec![i as u8; *size]).unwrap();
            fs::write(root.join(format!("{i}b.bin")), vec![i as u8; *size]).unwrap();
        }
        let names = ["0a.bin", "0b.bin", "1a.bin", "1b.bin", "2a.bin", "2b.bin"];
        let inventory = inventory_of(root, &names);

        let config = DuplicateConfig::builder().max_groups(2usize).build().unwrap();
        let report = DuplicateFinder::with_config(config).find_duplicates(&inventory);

        assert_eq!(report.group_count, 2);
        assert_eq!(report.groups[0].size, 4000);
        assert_eq!(report.groups[1].size, 3000);
    }

    #[test]
    fn test_progress_reaches_total() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.bin"), vec![9u8; 1500]).unwrap();
        fs::write(root.join("b.bin"), vec![9u8; 1500]).unwrap();

        let inventory = inventory_of(root, &["a.bin", "b.bin"]);
        let updates = Mutex::new(Vec::new());
        DuplicateFinder::new()
            .find_duplicates_with_progress(&inventory, |p| updates.lock().unwrap().push(p));

        let updates = updates.into_inner().unwrap();
        let last = updates.iter().max_by_key(|p| p.files_processed).unwrap();
        assert_eq!(last.files_processed, 2);
        assert_eq!(last.total_files, 2);
        assert_eq!(last.bytes_hashed, 3000);
    }
}
