//! `vfetch cache-dir` – print the resolved download directory.

use anyhow::Result;
use vfetch_core::config::FetchConfig;

pub fn run_cache_dir(cfg: &FetchConfig) -> Result<()> {
    let dir = cfg.cache_location().resolve()?;
    println!("{}", dir.display());
    Ok(())
}
