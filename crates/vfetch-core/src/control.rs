//! Cooperative cancellation for in-flight transfers.
//!
//! A `CancelToken` is handed to a transfer; workers check it between segments
//! and from inside libcurl callbacks. Clones share the same flag, so the CLI can
//! keep one clone for its Ctrl-C handler and pass another down to the job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
