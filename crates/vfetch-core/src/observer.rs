//! Download lifecycle events.
//!
//! Components report what they do through an injected `FetchObserver` instead
//! of logging directly, so callers decide where events go. `TracingObserver`
//! forwards to `tracing`; `MemoryObserver` keeps them for inspection.

use std::path::PathBuf;
use std::sync::Mutex;

/// One lifecycle event emitted by a transport or the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// A job started; all files go to `destination`.
    JobStarted { destination: PathBuf, files: usize },
    /// A single file transfer is starting.
    FetchStarted { url: String },
    /// The transport issued its request: a segment plan or a command line.
    RequestIssued { url: String, detail: String },
    FetchSucceeded { url: String, path: PathBuf },
    FetchFailed { url: String, error: String },
    JobSucceeded,
    JobFailed { error: String },
}

pub trait FetchObserver: Send + Sync {
    fn on_event(&self, event: &FetchEvent);
}

/// Forwards every event to `tracing` at info level (errors at error level).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_event(&self, event: &FetchEvent) {
        match event {
            FetchEvent::JobStarted { destination, files } => {
                tracing::info!(files, "starting download job into {}", destination.display())
            }
            FetchEvent::FetchStarted { url } => tracing::info!("downloading {}", url),
            FetchEvent::RequestIssued { url, detail } => {
                tracing::info!(%url, "running: {}", detail)
            }
            FetchEvent::FetchSucceeded { path, .. } => {
                tracing::info!("successfully downloaded to {}", path.display())
            }
            FetchEvent::FetchFailed { url, error } => {
                tracing::error!("failed to download {}: {}", url, error)
            }
            FetchEvent::JobSucceeded => tracing::info!("download job completed successfully"),
            FetchEvent::JobFailed { error } => tracing::error!("download job failed: {}", error),
        }
    }
}

/// Records events in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    events: Mutex<Vec<FetchEvent>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl FetchObserver for MemoryObserver {
    fn on_event(&self, event: &FetchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
