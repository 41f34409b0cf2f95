//! Request, state and event types exchanged with a running scan.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use diskscope_analyze::{
    DuplicateReport, HashProgress, ScanSummary, SpaceBreakdown, StaleReport, TopFileEntry,
};
use diskscope_core::{AnalysisOptions, Inventory, ScanConfig, ScanError, ScanWarning};
use diskscope_scan::ScanProgress;

/// Everything needed to run one scan: where to walk and what to compute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    pub config: ScanConfig,
    #[serde(default)]
    pub options: AnalysisOptions,
}

impl ScanRequest {
    pub fn new(config: ScanConfig, options: AnalysisOptions) -> Self {
        Self { config, options }
    }
}

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
    Analyzing,
    Done,
    Failed,
}

impl ScanState {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Message emitted while a scan runs, in emission order.
///
/// Non-terminal transitions arrive as [`ScanEvent::State`]. The terminal
/// state is signalled by exactly one [`ScanEvent::Done`] or
/// [`ScanEvent::Failed`], which is always the last event.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    State(ScanState),
    Progress(ScanProgress),
    HashProgress(HashProgress),
    Warning(ScanWarning),
    Inventory(Arc<Inventory>),
    Summary(ScanSummary),
    Duplicates(DuplicateReport),
    StaleFiles(StaleReport),
    LargestFiles(Vec<TopFileEntry>),
    Done,
    /// The scan stopped. `access` is set when the root could not be read,
    /// in which case `path` names it.
    Failed {
        message: String,
        path: Option<PathBuf>,
        access: bool,
    },
}

impl ScanEvent {
    /// Terminal event describing `err`.
    pub fn failed(err: &ScanError) -> Self {
        Self::Failed {
            message: err.to_string(),
            path: err.path().cloned(),
            access: err.is_access_error(),
        }
    }

    /// State this event moves the scan into, if any.
    pub fn state(&self) -> Option<ScanState> {
        match self {
            Self::State(state) => Some(*state),
            Self::Done => Some(ScanState::Done),
            Self::Failed { .. } => Some(ScanState::Failed),
            _ => None,
        }
    }
}

/// Aggregated results of a completed scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub inventory: Arc<Inventory>,
    pub summary: ScanSummary,
    pub breakdown: SpaceBreakdown,
    pub duplicates: Option<DuplicateReport>,
    pub stale: Option<StaleReport>,
    pub largest: Option<Vec<TopFileEntry>>,
}
