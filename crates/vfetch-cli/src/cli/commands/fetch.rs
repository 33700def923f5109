//! `vfetch fetch` – run the configured download job.

use anyhow::Result;
use vfetch_core::config::FetchConfig;

use super::run_job;

pub async fn run_fetch(cfg: FetchConfig) -> Result<()> {
    let job = cfg.job();
    for done in run_job(cfg, job).await? {
        println!("{}", done.path().display());
    }
    Ok(())
}
