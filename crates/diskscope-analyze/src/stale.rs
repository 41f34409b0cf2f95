//! Stale file detection based on last access time.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use diskscope_core::{Inventory, unix_seconds};

const SECONDS_PER_DAY: i64 = 86_400;

/// Configuration for stale file detection.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct StaleConfig {
    /// Files not accessed for this many days are stale.
    pub days: u32,

    /// Reference time for the cutoff, seconds since the epoch (default: now).
    #[builder(default = "unix_seconds(SystemTime::now())")]
    pub reference_time: i64,
}

impl StaleConfig {
    /// Create a new config builder.
    pub fn builder() -> StaleConfigBuilder {
        StaleConfigBuilder::default()
    }

    /// Threshold relative to now.
    pub fn new(days: u32) -> Self {
        Self {
            days,
            reference_time: unix_seconds(SystemTime::now()),
        }
    }

    /// Access times strictly before this are stale.
    pub fn cutoff(&self) -> i64 {
        self.reference_time - i64::from(self.days) * SECONDS_PER_DAY
    }
}

/// A file that has not been accessed since the cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleFileEntry {
    pub path: PathBuf,
    pub size: u64,
    /// Last access, seconds since the epoch.
    pub accessed: i64,
}

impl StaleFileEntry {
    /// Time since last access, relative to `reference_time`.
    pub fn age(&self, reference_time: i64) -> Duration {
        Duration::from_secs(reference_time.saturating_sub(self.accessed).max(0) as u64)
    }
}

/// Results from stale file detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaleReport {
    /// Cutoff that was applied, seconds since the epoch.
    pub cutoff: i64,
    /// Stale files, least recently accessed first.
    pub files: Vec<StaleFileEntry>,
    /// Combined size of all stale files.
    pub total_size: u64,
}

impl StaleReport {
    /// Check if no stale files were found.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Stale file finder.
pub struct StaleFinder {
    config: StaleConfig,
}

impl StaleFinder {
    /// Finder with the cutoff `days` before now.
    pub fn new(days: u32) -> Self {
        Self {
            config: StaleConfig::new(days),
        }
    }

    /// Create a finder with custom config.
    pub fn with_config(config: StaleConfig) -> Self {
        Self { config }
    }

    /// Select every file whose last access is older than the cutoff.
    pub fn find(&self, inventory: &Inventory) -> StaleReport {
        let cutoff = self.config.cutoff();

        let mut files: Vec<StaleFileEntry> = inventory
            .files
            .iter()
            .filter(|f| f.accessed < cutoff)
            .map(|f| StaleFileEntry {
                path: f.path.clone(),
                size: f.size,
                accessed: f.accessed,
            })
            .collect();

        files.sort_by(|a, b| a.accessed.cmp(&b.accessed).then_with(|| a.path.cmp(&b.path)));

        let total_size = files.iter().map(|f| f.size).sum();

        tracing::debug!(cutoff, stale = files.len(), "stale detection finished");

        StaleReport {
            cutoff,
            files,
            total_size,
        }
    }
}

/// Format a duration as a human-readable age string.
pub fn format_age(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs} seconds")
    } else if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else if secs < 86400 {
        format!("{} hours", secs / 3600)
    } else if secs < 2592000 {
        format!("{} days", secs / 86400)
    } else if secs < 31536000 {
        format!("{} months", secs / 2592000)
    } else {
        format!("{:.1} years", secs as f64 / 31536000.0)
    }
}
