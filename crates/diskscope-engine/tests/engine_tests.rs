use diskscope_core::{AnalysisOptions, ScanConfig};
use diskscope_engine::{Orchestrator, ScanEvent, ScanRequest, ScanState, start_scan};
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

fn full_options() -> AnalysisOptions {
    AnalysisOptions::builder()
        .compute_duplicates(true)
        .stale_days(Some(30u32))
        .top_n(Some(3usize))
        .build()
        .unwrap()
}

fn sample_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("photos/2023")).unwrap();
    fs::create_dir_all(root.join("backup")).unwrap();

    let shared = vec![7u8; 2000];
    fs::write(root.join("A.jpg"), &shared).unwrap();
    fs::write(root.join("photos/B.jpg"), &shared).unwrap();
    fs::write(root.join("photos/2023/C.jpg"), &shared).unwrap();
    fs::write(root.join("backup/small.txt"), vec![1u8; 500]).unwrap();
    fs::write(root.join("backup/small-copy.txt"), vec![1u8; 500]).unwrap();
    fs::write(root.join("backup/empty"), b"").unwrap();
    temp
}

fn position(events: &[ScanEvent], pred: impl Fn(&ScanEvent) -> bool) -> usize {
    events.iter().position(pred).expect("event present")
}

#[test]
fn test_event_sequence() {
    let temp = sample_tree();
    let request = ScanRequest::new(ScanConfig::new(temp.path()), full_options());

    let events = Mutex::new(Vec::new());
    let report = Orchestrator::new()
        .run(&request, |e| events.lock().unwrap().push(e))
        .unwrap();
    let events = events.into_inner().unwrap();

    assert!(matches!(events.first(), Some(ScanEvent::State(ScanState::Scanning))));
    assert!(matches!(events.last(), Some(ScanEvent::Done)));

    let inventory = position(&events, |e| matches!(e, ScanEvent::Inventory(_)));
    let analyzing = position(&events, |e| matches!(e, ScanEvent::State(ScanState::Analyzing)));
    let summary = position(&events, |e| matches!(e, ScanEvent::Summary(_)));
    let duplicates = position(&events, |e| matches!(e, ScanEvent::Duplicates(_)));
    let stale = position(&events, |e| matches!(e, ScanEvent::StaleFiles(_)));
    let largest = position(&events, |e| matches!(e, ScanEvent::LargestFiles(_)));
    let last_progress = events
        .iter()
        .rposition(|e| matches!(e, ScanEvent::Progress(_)))
        .expect("final walk progress");

    assert!(last_progress < inventory);
    assert!(inventory < analyzing);
    assert!(analyzing < summary);
    assert!(summary < duplicates && duplicates < stale && stale < largest);

    let terminal = events.iter().filter(|e| e.state().is_some_and(ScanState::is_terminal));
    assert_eq!(terminal.count(), 1);

    assert_eq!(report.summary.file_count, 6);
    assert_eq!(report.summary.total_size_bytes, 7000);

    let dups = report.duplicates.unwrap();
    assert_eq!(dups.group_count, 1);
    assert_eq!(dups.groups[0].paths.len(), 3);
    assert_eq!(dups.groups[0].wasted_bytes, 4000);

    // Freshly written files were accessed just now.
    assert!(report.stale.unwrap().is_empty());

    let largest = report.largest.unwrap();
    assert_eq!(largest.len(), 3);
    assert!(largest.iter().all(|e| e.size == 2000));

    let labels: Vec<_> = report.breakdown.slices.iter().map(|s| s.label.to_string()).collect();
    assert_eq!(labels, vec!["photos", "A.jpg", "backup"]);
}

#[test]
fn test_missing_root_fails_once() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("does-not-exist");
    let request = ScanRequest::new(ScanConfig::new(&missing), full_options());

    let events = Mutex::new(Vec::new());
    let result = Orchestrator::new().run(&request, |e| events.lock().unwrap().push(e));
    let events = events.into_inner().unwrap();

    let err = result.unwrap_err();
    assert!(err.is_access_error());
    match events.last() {
        Some(ScanEvent::Failed { path, access, .. }) => {
            assert!(*access);
            assert_eq!(path.as_deref(), Some(missing.as_path()));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(events.iter().filter(|e| e.state().is_some_and(ScanState::is_terminal)).count(), 1);
    assert!(!events.iter().any(|e| matches!(e, ScanEvent::Summary(_) | ScanEvent::Inventory(_))));
}

#[test]
fn test_empty_root_yields_zeroed_report() {
    let temp = TempDir::new().unwrap();
    let request = ScanRequest::new(ScanConfig::new(temp.path()), full_options());

    let report = Orchestrator::new().run(&request, |_| {}).unwrap();

    assert_eq!(report.summary.file_count, 0);
    assert_eq!(report.summary.average_size_bytes, 0.0);
    assert!(!report.duplicates.unwrap().has_duplicates());
    assert!(report.largest.unwrap().is_empty());
    assert!(report.breakdown.slices.is_empty());
}

#[test]
fn test_report_serializes_to_json() {
    let temp = sample_tree();
    let request = ScanRequest::new(ScanConfig::new(temp.path()), full_options());
    let report = Orchestrator::new().run(&request, |_| {}).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["summary"]["file_count"], 6);
    assert_eq!(json["inventory"]["files"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_start_scan_streams_events() {
    let temp = sample_tree();
    let mut handle = start_scan(ScanRequest::new(ScanConfig::new(temp.path()), full_options()));
    assert_eq!(handle.state(), ScanState::Idle);

    let mut saw_summary = false;
    let mut saw_duplicates = false;
    while let Some(event) = handle.recv().await {
        match event {
            ScanEvent::Summary(summary) => {
                assert_eq!(summary.file_count, 6);
                saw_summary = true;
            }
            ScanEvent::Duplicates(report) => saw_duplicates = report.has_duplicates(),
            _ => {}
        }
    }

    assert!(saw_summary);
    assert!(saw_duplicates);
    assert_eq!(handle.state(), ScanState::Done);

    let report = handle.finish().await.unwrap();
    assert_eq!(report.summary.total_size_bytes, 7000);
}

#[tokio::test]
async fn test_start_scan_failure_result() {
    let temp = TempDir::new().unwrap();
    let handle = start_scan(ScanRequest::new(
        ScanConfig::new(temp.path().join("missing")),
        AnalysisOptions::default(),
    ));

    let err = handle.finish().await.unwrap_err();
    assert!(err.is_access_error());
}
