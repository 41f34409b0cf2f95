//! Optional TOML settings file.
//!
//! ```toml
//! [scan]
//! ignore_patterns = ["node_modules", "*.tmp"]
//! include_hidden = false
//!
//! [analysis]
//! min_duplicate_size = 4096
//! stale_days = 365
//! top_n = 50
//! ```
//!
//! Values here seed a request; command-line flags override them.

use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Deserialize;

use diskscope_core::{AnalysisOptions, ScanConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub scan: ScanSettings,
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSettings {
    pub follow_symlinks: Option<bool>,
    pub max_depth: Option<u32>,
    pub ignore_patterns: Vec<String>,
    pub threads: Option<usize>,
    pub include_hidden: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    pub min_duplicate_size: Option<u64>,
    pub stale_days: Option<u32>,
    pub top_n: Option<usize>,
}

impl Settings {
    /// Read settings from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing settings in {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Scan config for `root` seeded from the `[scan]` table.
    pub fn scan_config(&self, root: &Path) -> ScanConfig {
        let mut config = ScanConfig::new(root);
        let scan = &self.scan;
        if let Some(follow) = scan.follow_symlinks {
            config.follow_symlinks = follow;
        }
        config.max_depth = scan.max_depth;
        config.ignore_patterns = scan.ignore_patterns.clone();
        if let Some(threads) = scan.threads {
            config.threads = threads;
        }
        if let Some(hidden) = scan.include_hidden {
            config.include_hidden = hidden;
        }
        config
    }

    /// Analysis options seeded from the `[analysis]` table.
    pub fn analysis_options(&self) -> AnalysisOptions {
        let mut options = AnalysisOptions::default();
        if let Some(min) = self.analysis.min_duplicate_size {
            options.min_duplicate_size = min;
        }
        options.stale_days = self.analysis.stale_days;
        options.top_n = self.analysis.top_n.filter(|n| *n > 0);
        options
    }
}
