//! Synchronous scan pipeline: walk once, then fan the inventory out to the
//! requested analyzers.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tokio::sync::broadcast::error::RecvError;

use diskscope_analyze::{
    DEFAULT_SLICES, DuplicateConfig, DuplicateFinder, StaleFinder, largest_files, space_breakdown,
    summarize,
};
use diskscope_core::{AnalysisOptions, Inventory, ScanConfig, ScanError};
use diskscope_scan::Walker;

use crate::event::{ScanEvent, ScanReport, ScanRequest, ScanState};

/// Runs scans and analyses.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    breakdown_slices: usize,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            breakdown_slices: DEFAULT_SLICES,
        }
    }

    /// Number of named slices in the space breakdown.
    pub fn with_breakdown_slices(mut self, slices: usize) -> Self {
        self.breakdown_slices = slices;
        self
    }

    /// Walk the requested root once and run every requested analysis,
    /// emitting events to `emit` as each step completes.
    ///
    /// `emit` may be called from several threads at once while files are
    /// being fingerprinted.
    pub fn run<F>(&self, request: &ScanRequest, emit: F) -> Result<ScanReport, ScanError>
    where
        F: Fn(ScanEvent) + Sync,
    {
        let start = Instant::now();
        emit(ScanEvent::State(ScanState::Scanning));

        let inventory = match walk(&request.config, &emit) {
            Ok(inventory) => inventory,
            Err(err) => {
                tracing::warn!(root = %request.config.root.display(), error = %err, "scan failed");
                emit(ScanEvent::failed(&err));
                return Err(err);
            }
        };

        for warning in &inventory.warnings {
            emit(ScanEvent::Warning(warning.clone()));
        }

        let inventory = Arc::new(inventory);
        emit(ScanEvent::Inventory(Arc::clone(&inventory)));

        emit(ScanEvent::State(ScanState::Analyzing));
        let report = self.analyze_with(inventory, &request.options, &emit);

        tracing::debug!(
            root = %request.config.root.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scan finished"
        );
        emit(ScanEvent::Done);

        Ok(report)
    }

    /// Run analyses over an inventory that was already walked.
    pub fn analyze(&self, inventory: Arc<Inventory>, options: &AnalysisOptions) -> ScanReport {
        self.analyze_with(inventory, options, &|_: ScanEvent| {})
    }

    fn analyze_with<F>(
        &self,
        inventory: Arc<Inventory>,
        options: &AnalysisOptions,
        emit: &F,
    ) -> ScanReport
    where
        F: Fn(ScanEvent) + Sync,
    {
        let summary = summarize(&inventory);
        emit(ScanEvent::Summary(summary));

        let breakdown = space_breakdown(&inventory, self.breakdown_slices);

        let duplicates = options.compute_duplicates.then(|| {
            let config = DuplicateConfig {
                min_size: options.min_duplicate_size,
                ..DuplicateConfig::default()
            };
            let report = DuplicateFinder::with_config(config)
                .find_duplicates_with_progress(&inventory, |progress| {
                    emit(ScanEvent::HashProgress(progress))
                });
            for warning in &report.unreadable {
                emit(ScanEvent::Warning(warning.clone()));
            }
            emit(ScanEvent::Duplicates(report.clone()));
            report
        });

        let stale = options.stale_days.map(|days| {
            let report = StaleFinder::new(days).find(&inventory);
            emit(ScanEvent::StaleFiles(report.clone()));
            report
        });

        let largest = options.top_n.map(|n| {
            let top = largest_files(&inventory, n);
            emit(ScanEvent::LargestFiles(top.clone()));
            top
        });

        ScanReport {
            inventory,
            summary,
            breakdown,
            duplicates,
            stale,
            largest,
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk on a helper thread while this thread relays progress, so progress
/// events always precede the inventory.
fn walk<F>(config: &ScanConfig, emit: &F) -> Result<Inventory, ScanError>
where
    F: Fn(ScanEvent) + Sync,
{
    let walker = Walker::new();
    let mut progress_rx = walker.subscribe();

    thread::scope(|scope| {
        // The walker, and with it the sender, is dropped when the walk ends.
        let walk = scope.spawn(move || walker.scan(config));

        loop {
            match progress_rx.blocking_recv() {
                Ok(progress) => emit(ScanEvent::Progress(progress)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress updates dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }

        walk.join()
            .unwrap_or_else(|_| Err(ScanError::failed("walker thread panicked")))
    })
}
