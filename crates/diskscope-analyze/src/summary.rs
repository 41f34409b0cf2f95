//! Whole-inventory size summary.

use serde::{Deserialize, Serialize};

use diskscope_core::Inventory;

/// Aggregate numbers over every file in an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub file_count: u64,
    pub total_size_bytes: u64,
    /// Mean file size; `0.0` for an empty inventory.
    pub average_size_bytes: f64,
}

/// Count, total and average size of the inventory.
pub fn summarize(inventory: &Inventory) -> ScanSummary {
    let file_count = inventory.file_count() as u64;
    let total_size_bytes = inventory.total_size();
    let average_size_bytes = if file_count == 0 {
        0.0
    } else {
        total_size_bytes as f64 / file_count as f64
    };

    ScanSummary {
        file_count,
        total_size_bytes,
        average_size_bytes,
    }
}
