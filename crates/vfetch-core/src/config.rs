use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::aria2::{Aria2Transport, ARIA2C};
use crate::cache::CacheLocation;
use crate::downloader::SegmentedDownloader;
use crate::error::FetchError;
use crate::job::{DownloadJob, JobEntry};
use crate::observer::FetchObserver;
use crate::transport::{TransferOptions, Transport};

/// Which transport moves the bytes: the built-in libcurl segmented downloader or
/// an external `aria2c` process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Curl,
    Aria2,
}

/// Global configuration loaded from `~/.config/vfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum parallel connections to the server for one file.
    pub max_connections_per_server: usize,
    /// Maximum number of segments one file is split into.
    pub split: usize,
    /// Minimum segment size in bytes.
    pub min_split_size: u64,
    /// Resume from partial output left by an earlier run.
    pub continue_partial: bool,
    /// Allow replacing an existing file at the target path.
    pub allow_overwrite: bool,
    #[serde(default)]
    pub transport: TransportKind,
    /// Explicit path to the `aria2c` binary (otherwise looked up on `PATH`).
    #[serde(default)]
    pub aria2c_path: Option<PathBuf>,
    /// Download directory; defaults to the XDG cache dir.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Files to fetch, in order. When absent, the dbSNP archive and its index.
    #[serde(default)]
    pub files: Option<Vec<JobEntry>>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let opts = TransferOptions::default();
        Self {
            max_connections_per_server: opts.max_connections_per_server,
            split: opts.split,
            min_split_size: opts.min_split_size,
            continue_partial: opts.continue_partial,
            allow_overwrite: opts.allow_overwrite,
            transport: TransportKind::default(),
            aria2c_path: None,
            cache_dir: None,
            files: None,
        }
    }
}

impl FetchConfig {
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            max_connections_per_server: self.max_connections_per_server.max(1),
            split: self.split.max(1),
            min_split_size: self.min_split_size.max(1),
            continue_partial: self.continue_partial,
            allow_overwrite: self.allow_overwrite,
        }
    }

    pub fn cache_location(&self) -> CacheLocation {
        CacheLocation::from_override(self.cache_dir.clone())
    }

    /// The configured `[[files]]`, or the dbSNP reference job.
    pub fn job(&self) -> DownloadJob {
        match &self.files {
            Some(files) => DownloadJob::new(files.clone()),
            None => DownloadJob::dbsnp(),
        }
    }

    /// Builds the selected transport with this config's options. Fails with
    /// `ToolUnavailable` when `aria2c` is selected but cannot be found.
    pub fn build_transport(
        &self,
        observer: Arc<dyn FetchObserver>,
    ) -> Result<Box<dyn Transport>, FetchError> {
        let options = self.transfer_options();
        let transport: Box<dyn Transport> = match self.transport {
            TransportKind::Curl => Box::new(
                SegmentedDownloader::new()
                    .options(options)
                    .observer(observer),
            ),
            TransportKind::Aria2 => {
                let program = self.aria2c_path.clone().unwrap_or_else(|| ARIA2C.into());
                Box::new(
                    Aria2Transport::with_program(program)?
                        .options(options)
                        .observer(observer),
                )
            }
        };
        Ok(transport)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vfetch")?;
    xdg_dirs
        .place_config_file("config.toml")
        .context("creating config directory")
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: FetchConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}
