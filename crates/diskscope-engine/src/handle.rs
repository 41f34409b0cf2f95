//! Background scans streaming events over a channel.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use diskscope_core::ScanError;

use crate::event::{ScanEvent, ScanReport, ScanRequest, ScanState};
use crate::orchestrator::Orchestrator;

/// Channel buffer size for scan events.
pub const SCAN_CHANNEL_SIZE: usize = 100;

/// A scan running on a blocking worker.
///
/// Dropping the handle abandons the scan: the worker runs to completion
/// and its events are discarded.
pub struct ScanHandle {
    events: mpsc::Receiver<ScanEvent>,
    task: JoinHandle<Result<ScanReport, ScanError>>,
    state: ScanState,
}

impl ScanHandle {
    /// Next event, or `None` once the worker has finished and every event
    /// has been received.
    pub async fn recv(&mut self) -> Option<ScanEvent> {
        let event = self.events.recv().await?;
        if let Some(state) = event.state() {
            self.state = state;
        }
        Some(event)
    }

    /// State as of the last received event.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Discard remaining events and wait for the final result.
    pub async fn finish(mut self) -> Result<ScanReport, ScanError> {
        while self.recv().await.is_some() {}
        self.task
            .await
            .unwrap_or_else(|e| Err(ScanError::failed(e.to_string())))
    }
}

/// Start a scan in the background.
///
/// Must be called from within a tokio runtime.
pub fn start_scan(request: ScanRequest) -> ScanHandle {
    start_scan_with(Orchestrator::new(), request)
}

/// Start a scan in the background using a configured orchestrator.
pub fn start_scan_with(orchestrator: Orchestrator, request: ScanRequest) -> ScanHandle {
    let (tx, rx) = mpsc::channel(SCAN_CHANNEL_SIZE);

    // jwalk and rayon block; keep them off the async workers.
    let task = tokio::task::spawn_blocking(move || {
        run_guarded(&orchestrator, &request, |event| {
            let _ = tx.blocking_send(event);
        })
    });

    ScanHandle {
        events: rx,
        task,
        state: ScanState::Idle,
    }
}

/// Run a scan, turning a panic in the pipeline into a `Failed` event so the
/// stream always ends in a terminal state.
fn run_guarded<F>(
    orchestrator: &Orchestrator,
    request: &ScanRequest,
    emit: F,
) -> Result<ScanReport, ScanError>
where
    F: Fn(ScanEvent) + Sync,
{
    match panic::catch_unwind(AssertUnwindSafe(|| orchestrator.run(request, &emit))) {
        Ok(result) => result,
        Err(payload) => {
            let message = format!("scan worker panicked: {}", panic_message(&*payload));
            let err = ScanError::failed(message);
            tracing::error!(root = %request.config.root.display(), error = %err, "scan aborted");
            emit(ScanEvent::failed(&err));
            Err(err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use diskscope_core::{AnalysisOptions, ScanConfig};

    #[test]
    fn test_panic_after_walk_ends_in_failed() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "data").unwrap();
        let request = ScanRequest::new(ScanConfig::new(temp.path()), AnalysisOptions::default());

        let events = Mutex::new(Vec::new());
        let result = run_guarded(&Orchestrator::new(), &request, |event| {
            let is_summary = matches!(event, ScanEvent::Summary(_));
            events.lock().unwrap().push(event);
            if is_summary {
                panic!("analyzer exploded");
            }
        });
        let events = events.into_inner().unwrap();

        let err = result.unwrap_err();
        assert!(!err.is_access_error());
        assert!(err.to_string().contains("analyzer exploded"));

        match events.last() {
            Some(ScanEvent::Failed { message, access, .. }) => {
                assert!(message.contains("analyzer exploded"));
                assert!(!access);
            }
            other => panic!("expected a terminal Failed event, got {other:?}"),
        }
        let terminal = events.iter().filter(|e| e.state().is_some_and(ScanState::is_terminal));
        assert_eq!(terminal.count(), 1);
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
