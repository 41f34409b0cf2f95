//! Largest-file ranking.

use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use diskscope_core::Inventory;

/// One entry of the largest-files list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopFileEntry {
    pub path: PathBuf,
    pub name: CompactString,
    pub size: u64,
    /// Last modification, seconds since the epoch.
    pub modified: i64,
}

/// The `n` largest non-empty files, largest first.
///
/// Files of equal size keep their inventory order.
pub fn largest_files(inventory: &Inventory, n: usize) -> Vec<TopFileEntry> {
    let mut files: Vec<_> = inventory.files.iter().filter(|f| f.size > 0).collect();
    // sort_by is stable
    files.sort_by(|a, b| b.size.cmp(&a.size));
    files.truncate(n);

    files
        .into_iter()
        .map(|f| TopFileEntry {
            path: f.path.clone(),
            name: f.name.clone(),
            size: f.size,
            modified: f.modified,
        })
        .collect()
}
