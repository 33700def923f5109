//! Core segmented downloader engine.
//!
//! Probes the URL, decides between a ranged and a single-stream transfer,
//! resumes from whatever an earlier run left at the target path, runs up to N
//! concurrent range requests that each write at their own offset, and keeps a
//! control file up to date so an interrupted run can continue.

mod curl_fetcher;
mod error;
mod fetcher;
mod plan;
mod run;
mod segment;

#[cfg(test)]
mod tests;

pub use curl_fetcher::CurlFetcher;
pub use error::SegmentError;
pub use fetcher::{RangeFetcher, Sink};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache;
use crate::control::CancelToken;
use crate::error::FetchError;
use crate::observer::{FetchEvent, FetchObserver, TracingObserver};
use crate::resume::{ControlFile, ResumeState};
use crate::storage::{self, StorageWriter, StorageWriterBuilder};
use crate::transport::{DownloadRequest, DownloadResult, TransferOptions, Transport};

use plan::{plan_transfer, remaining_bytes, TransferPlan};

/// In-process multi-connection transport.
pub struct SegmentedDownloader<F = CurlFetcher> {
    fetcher: F,
    options: TransferOptions,
    observer: Arc<dyn FetchObserver>,
}

impl SegmentedDownloader<CurlFetcher> {
    /// libcurl-backed downloader with default options, reporting to `tracing`.
    pub fn new() -> Self {
        Self::with_fetcher(CurlFetcher::new())
    }
}

impl Default for SegmentedDownloader<CurlFetcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: RangeFetcher> SegmentedDownloader<F> {
    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            fetcher,
            options: TransferOptions::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Download `url` into `destination_dir` (created if missing), named
    /// `filename` or the URL's last path segment.
    pub fn fetch(
        &self,
        url: &str,
        destination_dir: &Path,
        filename: Option<&str>,
    ) -> Result<DownloadResult, FetchError> {
        let mut request = DownloadRequest::new(url, destination_dir);
        request.filename = filename.map(String::from);
        self.transfer(&request, &CancelToken::new())
    }

    fn run_transfer(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<PathBuf, FetchError> {
        let url = request.url.as_str();
        let target = request.target_path()?;
        cache::ensure_dir(&request.destination_dir)?;

        let head = self
            .fetcher
            .probe(url)
            .map_err(|e| segment_failure(url, e))?;

        let existing_len =
            storage::existing_len(&target).map_err(|e| FetchError::filesystem(&target, e))?;
        let mut builder =
            StorageWriterBuilder::open(&target).map_err(|e| FetchError::filesystem(&target, e))?;
        builder.lock().map_err(|e| match e.kind() {
            io::ErrorKind::WouldBlock => FetchError::TargetBusy {
                path: target.clone(),
            },
            _ => FetchError::filesystem(&target, e),
        })?;

        // Read the control file only once the lock is held.
        let stored = if self.options.continue_partial {
            ResumeState::load(&target).map_err(|e| FetchError::filesystem(&target, e))?
        } else {
            ControlFile::Missing
        };
        let plan = plan_transfer(url, &head, &self.options, stored, existing_len);

        if plan.discards_existing()
            && existing_len.is_some_and(|len| len > 0)
            && !self.options.allow_overwrite
        {
            return Err(FetchError::filesystem(
                &target,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "file exists and overwriting is disabled",
                ),
            ));
        }

        match plan {
            TransferPlan::Segmented { state, truncate } => {
                self.run_segmented(request, &target, builder, state, truncate, cancel)?
            }
            TransferPlan::Single { expected_len } => {
                self.run_single(request, &target, builder, expected_len, cancel)?
            }
        }
        Ok(target)
    }

    fn run_segmented(
        &self,
        request: &DownloadRequest,
        target: &Path,
        mut builder: StorageWriterBuilder,
        mut state: ResumeState,
        truncate: bool,
        cancel: &CancelToken,
    ) -> Result<(), FetchError> {
        let url = request.url.as_str();
        let fs_err = |e: io::Error| FetchError::filesystem(target, e);

        let mut bitmap = state.bitmap();
        let incomplete = bitmap.incomplete(&state.segments);

        if truncate {
            builder.truncate().map_err(fs_err)?;
        }
        if !incomplete.is_empty() {
            // A full-length target without a control file reads as complete,
            // so the control file must exist before the file is extended.
            state.save(target).map_err(fs_err)?;
            builder.preallocate(state.total_size).map_err(fs_err)?;
        }
        let writer = builder.build();

        let workers = self
            .options
            .max_connections_per_server
            .min(incomplete.len())
            .max(1);
        let resume_from = incomplete
            .first()
            .map(|(_, s)| s.start)
            .unwrap_or(state.total_size);
        self.observer.on_event(&FetchEvent::RequestIssued {
            url: url.to_string(),
            detail: format!(
                "segmented GET {} -> {}: {} of {} bytes in {} segment(s) over {} connection(s), resuming at byte {}",
                url,
                target.display(),
                remaining_bytes(&state),
                state.total_size,
                incomplete.len(),
                workers,
                resume_from,
            ),
        });

        if incomplete.is_empty() {
            writer.sync().map_err(fs_err)?;
            ResumeState::remove(target).map_err(fs_err)?;
            return Ok(());
        }

        let result = run::run_segments(
            &self.fetcher,
            url,
            &writer,
            incomplete,
            self.options.max_connections_per_server,
            cancel,
            &mut bitmap,
            |bm| persist_progress(&writer, &mut state, bm, target),
        );
        state.set_bitmap(&bitmap);

        match result {
            Ok(()) if bitmap.all_completed(state.segments.len()) => {
                writer.sync().map_err(fs_err)?;
                ResumeState::remove(target).map_err(fs_err)?;
                Ok(())
            }
            Ok(()) => Err(FetchError::transfer(url, "transfer stopped with segments missing")),
            Err((index, err)) => {
                if let Err(e) = state.save(target) {
                    tracing::warn!(path = %target.display(), "could not persist progress: {}", e);
                }
                tracing::debug!(%url, segment = index, "segmented transfer failed");
                Err(segment_failure(url, err))
            }
        }
    }

    fn run_single(
        &self,
        request: &DownloadRequest,
        target: &Path,
        mut builder: StorageWriterBuilder,
        expected_len: Option<u64>,
        cancel: &CancelToken,
    ) -> Result<(), FetchError> {
        let url = request.url.as_str();
        let fs_err = |e: io::Error| FetchError::filesystem(target, e);

        self.observer.on_event(&FetchEvent::RequestIssued {
            url: url.to_string(),
            detail: format!(
                "single GET {} -> {} (server does not support ranges or size is unknown)",
                url,
                target.display()
            ),
        });

        ResumeState::remove(target).map_err(fs_err)?;
        builder.truncate().map_err(fs_err)?;
        if let Some(n) = expected_len {
            builder.preallocate(n).map_err(fs_err)?;
        }
        let writer: StorageWriter = builder.build();

        let written = segment::download_whole(&self.fetcher, url, &writer, expected_len, cancel)
            .map_err(|e| segment_failure(url, e))?;
        if expected_len.is_none() {
            writer.set_len(written).map_err(fs_err)?;
        }
        writer.sync().map_err(fs_err)?;
        Ok(())
    }
}

impl<F: RangeFetcher> Transport for SegmentedDownloader<F> {
    fn transfer(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<DownloadResult, FetchError> {
        self.observer.on_event(&FetchEvent::FetchStarted {
            url: request.url.clone(),
        });
        match self.run_transfer(request, cancel) {
            Ok(path) => {
                self.observer.on_event(&FetchEvent::FetchSucceeded {
                    url: request.url.clone(),
                    path: path.clone(),
                });
                Ok(DownloadResult { path })
            }
            Err(e) => {
                self.observer.on_event(&FetchEvent::FetchFailed {
                    url: request.url.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

/// Flush written data, then record the bitmap, so the control file never
/// claims bytes that are not on disk.
fn persist_progress(
    writer: &StorageWriter,
    state: &mut ResumeState,
    bitmap: &crate::segmenter::SegmentBitmap,
    target: &Path,
) {
    state.set_bitmap(bitmap);
    let res = writer.sync().and_then(|()| state.save(target));
    if let Err(e) = res {
        tracing::warn!(path = %target.display(), "could not persist progress: {}", e);
    }
}

fn segment_failure(url: &str, err: SegmentError) -> FetchError {
    match err {
        SegmentError::Cancelled => FetchError::Cancelled {
            url: url.to_string(),
        },
        other => FetchError::transfer(url, other.to_string()),
    }
}
