//! Scan and analysis configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default lower bound (exclusive) for duplicate candidates, in bytes.
const DEFAULT_MIN_DUPLICATE_SIZE: u64 = 1024;

/// Configuration for the directory walk.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Maximum depth to traverse (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Glob patterns matched against entry names; matching directories
    /// are not descended into.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of threads for scanning (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            max_depth: None,
            ignore_patterns: Vec::new(),
            threads: 0,
            include_hidden: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Which analyses to run over the inventory. The size summary always runs.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq, Eq)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct AnalysisOptions {
    /// Group files with identical size and fingerprint.
    #[builder(default = "false")]
    #[serde(default)]
    pub compute_duplicates: bool,

    /// Report files not accessed for this many days.
    #[builder(default)]
    #[serde(default)]
    pub stale_days: Option<u32>,

    /// Report this many largest files.
    #[builder(default)]
    #[serde(default)]
    pub top_n: Option<usize>,

    /// Files at or below this size are never duplicate candidates.
    #[builder(default = "DEFAULT_MIN_DUPLICATE_SIZE")]
    #[serde(default = "default_min_duplicate_size")]
    pub min_duplicate_size: u64,
}

fn default_min_duplicate_size() -> u64 {
    DEFAULT_MIN_DUPLICATE_SIZE
}

impl AnalysisOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(0)) = self.top_n {
            return Err("top_n must be at least 1".to_string());
        }
        Ok(())
    }
}

impl AnalysisOptions {
    /// Create a new analysis options builder.
    pub fn builder() -> AnalysisOptionsBuilder {
        AnalysisOptionsBuilder::default()
    }

    /// Summary only.
    pub fn summary_only() -> Self {
        Self::default()
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            compute_duplicates: false,
            stale_days: None,
            top_n: None,
            min_duplicate_size: DEFAULT_MIN_DUPLICATE_SIZE,
        }
    }
}
