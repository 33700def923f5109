//! `vfetch get <URL>` – download one file.

use anyhow::{anyhow, Result};
use vfetch_core::config::FetchConfig;
use vfetch_core::url_model::resolve_filename;
use vfetch_core::{DownloadJob, JobEntry};

use super::run_job;

pub async fn run_get(cfg: FetchConfig, url: String, out: Option<String>) -> Result<()> {
    // Reject an unusable name before touching the network.
    resolve_filename(&url, out.as_deref()).map_err(|reason| anyhow!("{}: {}", url, reason))?;

    for done in run_job(cfg, DownloadJob::new(vec![JobEntry { url, filename: out }])).await? {
        println!("{}", done.path().display());
    }
    Ok(())
}
