//! Transport abstraction: one capability, "put this URL into that directory".
//!
//! The orchestrator only sees `Transport`. `SegmentedDownloader` implements it
//! in-process over libcurl; `Aria2Transport` shells out to `aria2c`.

use std::path::{Path, PathBuf};

use crate::control::CancelToken;
use crate::error::FetchError;
use crate::url_model;

/// Default number of parallel connections per file.
pub const DEFAULT_MAX_CONNECTIONS: usize = 16;
/// Default maximum number of segments per file.
pub const DEFAULT_SPLIT: usize = 16;
/// Default minimum segment size (1 MiB).
pub const DEFAULT_MIN_SPLIT_SIZE: u64 = 1024 * 1024;

/// Knobs shared by every transport. Output is never auto-renamed, so there is
/// no option for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub max_connections_per_server: usize,
    pub split: usize,
    pub min_split_size: u64,
    pub continue_partial: bool,
    pub allow_overwrite: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            max_connections_per_server: DEFAULT_MAX_CONNECTIONS,
            split: DEFAULT_SPLIT,
            min_split_size: DEFAULT_MIN_SPLIT_SIZE,
            continue_partial: true,
            allow_overwrite: true,
        }
    }
}

/// One remote file to fetch into one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination_dir: PathBuf,
    /// Local name; when `None` the last path segment of `url` is used.
    pub filename: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination_dir: destination_dir.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// `destination_dir / filename`, or `destination_dir / basename(url)`.
    pub fn target_path(&self) -> Result<PathBuf, FetchError> {
        let name = url_model::resolve_filename(&self.url, self.filename.as_deref()).map_err(
            |reason| FetchError::InvalidRequest {
                url: self.url.clone(),
                reason: reason.to_string(),
            },
        )?;
        Ok(self.destination_dir.join(name))
    }
}

/// A completed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub path: PathBuf,
}

impl DownloadResult {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub trait Transport: Send + Sync {
    /// Fetch `request.url` into `request.destination_dir`, blocking until the
    /// file is complete or the transfer fails.
    fn transfer(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<DownloadResult, FetchError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transfer(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<DownloadResult, FetchError> {
        (**self).transfer(request, cancel)
    }
}
