//! Scan orchestration for diskscope.
//!
//! A scan walks the root exactly once, freezes the result into a shared
//! [`Inventory`](diskscope_core::Inventory) and runs the requested analyses
//! over it. Results are delivered as [`ScanEvent`]s as soon as each step
//! completes, and collected into a [`ScanReport`].
//!
//! ```rust,no_run
//! use diskscope_core::{AnalysisOptions, ScanConfig};
//! use diskscope_engine::{ScanEvent, ScanRequest, start_scan};
//!
//! # async fn example() {
//! let options = AnalysisOptions::builder()
//!     .compute_duplicates(true)
//!     .top_n(Some(20usize))
//!     .build()
//!     .unwrap();
//! let mut handle = start_scan(ScanRequest::new(ScanConfig::new("/data"), options));
//!
//! while let Some(event) = handle.recv().await {
//!     if let ScanEvent::Progress(p) = event {
//!         println!("{} files", p.files_scanned);
//!     }
//! }
//! # }
//! ```

mod event;
mod handle;
mod orchestrator;

pub use event::{ScanEvent, ScanReport, ScanRequest, ScanState};
pub use handle::{SCAN_CHANNEL_SIZE, ScanHandle, start_scan, start_scan_with};
pub use orchestrator::Orchestrator;
