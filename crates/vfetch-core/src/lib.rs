//! vfetch core: segmented, resumable downloads of reference data files into a
//! local cache directory.
//!
//! Pipeline per file: fetch_head → resume validation → segmenter → downloader
//! → storage. Jobs run their files in order through a [`Transport`], either the
//! in-process [`SegmentedDownloader`] or the external [`Aria2Transport`].

pub mod aria2;
pub mod cache;
pub mod config;
pub mod control;
pub mod downloader;
pub mod error;
pub mod fetch_head;
pub mod job;
pub mod logging;
pub mod observer;
pub mod resume;
pub mod segmenter;
pub mod storage;
pub mod transport;
pub mod url_model;

pub use aria2::Aria2Transport;
pub use cache::CacheLocation;
pub use control::CancelToken;
pub use downloader::{CurlFetcher, SegmentedDownloader};
pub use error::FetchError;
pub use job::{DownloadJob, JobEntry, JobState, Orchestrator};
pub use observer::{FetchEvent, FetchObserver, MemoryObserver, TracingObserver};
pub use transport::{DownloadRequest, DownloadResult, TransferOptions, Transport};
