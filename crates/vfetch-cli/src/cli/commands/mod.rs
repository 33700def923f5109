//! CLI command handlers, one per file.

mod cache_dir;
mod fetch;
mod get;

pub use cache_dir::run_cache_dir;
pub use fetch::run_fetch;
pub use get::run_get;

use anyhow::{Context, Result};
use std::sync::Arc;
use vfetch_core::config::FetchConfig;
use vfetch_core::{
    CancelToken, DownloadJob, DownloadResult, FetchObserver, Orchestrator, TracingObserver,
};

/// Runs `job` on the blocking pool with Ctrl-C wired to cancellation. Returns
/// the completed files in job order.
async fn run_job(cfg: FetchConfig, mut job: DownloadJob) -> Result<Vec<DownloadResult>> {
    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping transfers");
                eprintln!("interrupted, stopping (progress is kept for the next run)");
                cancel.cancel();
            }
        })
    };

    let result = tokio::task::spawn_blocking(move || {
        let observer: Arc<dyn FetchObserver> = Arc::new(TracingObserver);
        let transport = cfg.build_transport(Arc::clone(&observer))?;
        Orchestrator::new(transport, cfg.cache_location())
            .observer(observer)
            .run(&mut job, &cancel)
    })
    .await
    .context("download task failed to complete")?;
    interrupt.abort();

    Ok(result?)
}
