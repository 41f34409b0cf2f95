//! Space breakdown of the scan root's direct children.

use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use diskscope_core::Inventory;

/// Default number of named slices before the remainder is collapsed.
pub const DEFAULT_SLICES: usize = 7;

/// Label of the slice holding everything beyond the named slices.
pub const OTHER_LABEL: &str = "other";

/// One slice of the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSlice {
    /// Folder or file name, or [`OTHER_LABEL`].
    pub label: CompactString,
    /// Entry path; `None` for the collapsed remainder.
    pub path: Option<PathBuf>,
    pub size: u64,
    pub is_folder: bool,
}

/// Root-level space usage, largest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceBreakdown {
    pub slices: Vec<SpaceSlice>,
    /// Sum of every slice.
    pub total: u64,
}

/// Rank the root's folders and files by size, keeping `n` named slices.
///
/// Empty entries are left out. When more than `n` remain, the rest are
/// summed into one trailing [`OTHER_LABEL`] slice.
pub fn space_breakdown(inventory: &Inventory, n: usize) -> SpaceBreakdown {
    let folders = inventory
        .folders
        .iter()
        .filter(|f| f.size > 0)
        .map(|f| SpaceSlice {
            label: f.name.clone(),
            path: Some(f.path.clone()),
            size: f.size,
            is_folder: true,
        });
    let files = inventory.root_files().filter(|f| f.size > 0).map(|f| SpaceSlice {
        label: f.name.clone(),
        path: Some(f.path.clone()),
        size: f.size,
        is_folder: false,
    });

    let mut slices: Vec<SpaceSlice> = folders.chain(files).collect();
    slices.sort_by(|a, b| b.size.cmp(&a.size));

    if slices.len() > n {
        let rest: u64 = slices.drain(n..).map(|s| s.size).sum();
        slices.push(SpaceSlice {
            label: CompactString::new(OTHER_LABEL),
            path: None,
            size: rest,
            is_folder: false,
        });
    }

    let total = slices.iter().map(|s| s.size).sum();
    SpaceBreakdown { slices, total }
}
