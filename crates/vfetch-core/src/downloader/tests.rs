//! Segmented downloader behaviour against in-memory fetchers.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;
use crate::fetch_head::HeadResult;
use crate::observer::MemoryObserver;
use crate::resume::control_path;
use crate::segmenter::Segment;

/// Serves `body` from memory. Optionally delays early segments so they finish
/// last, and fails the segment starting at `fail_at`.
struct MemoryFetcher {
    body: Vec<u8>,
    ranges: bool,
    fail_at: Option<u64>,
    late_first: bool,
    chunk: usize,
    requested: Mutex<Vec<Segment>>,
    finished: Mutex<Vec<u64>>,
    full_gets: Mutex<usize>,
}

impl MemoryFetcher {
    fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            ranges: true,
            fail_at: None,
            late_first: false,
            chunk: 700,
            requested: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            full_gets: Mutex::new(0),
        }
    }

    fn requested(&self) -> Vec<Segment> {
        let mut r = self.requested.lock().unwrap().clone();
        r.sort_by_key(|s| s.start);
        r
    }
}

impl RangeFetcher for MemoryFetcher {
    fn probe(&self, _url: &str) -> Result<HeadResult, SegmentError> {
        Ok(HeadResult {
            content_length: Some(self.body.len() as u64),
            accept_ranges: self.ranges,
            etag: Some("v1".into()),
            last_modified: None,
        })
    }

    fn fetch_range(
        &self,
        _url: &str,
        segment: &Segment,
        sink: &mut Sink<'_>,
        cancel: &CancelToken,
    ) -> Result<(), SegmentError> {
        self.requested.lock().unwrap().push(*segment);
        if self.fail_at == Some(segment.start) {
            return Err(SegmentError::Http(503));
        }
        if self.late_first {
            let total = self.body.len() as u64;
            let ms = 5 + (total - segment.start) * 60 / total;
            std::thread::sleep(Duration::from_millis(ms));
        }
        let slice = &self.body[segment.start as usize..segment.end as usize];
        for chunk in slice.chunks(self.chunk) {
            if cancel.is_cancelled() {
                return Err(SegmentError::Cancelled);
            }
            sink(chunk)?;
        }
        self.finished.lock().unwrap().push(segment.start);
        Ok(())
    }

    fn fetch_all(
        &self,
        _url: &str,
        sink: &mut Sink<'_>,
        _cancel: &CancelToken,
    ) -> Result<(), SegmentError> {
        *self.full_gets.lock().unwrap() += 1;
        for chunk in self.body.chunks(self.chunk) {
            sink(chunk)?;
        }
        Ok(())
    }
}

/// Lets a test keep a handle on the fetcher after handing it to a downloader.
impl RangeFetcher for Arc<MemoryFetcher> {
    fn probe(&self, url: &str) -> Result<HeadResult, SegmentError> {
        (**self).probe(url)
    }

    fn fetch_range(
        &self,
        url: &str,
        segment: &Segment,
        sink: &mut Sink<'_>,
        cancel: &CancelToken,
    ) -> Result<(), SegmentError> {
        (**self).fetch_range(url, segment, sink, cancel)
    }

    fn fetch_all(
        &self,
        url: &str,
        sink: &mut Sink<'_>,
        cancel: &CancelToken,
    ) -> Result<(), SegmentError> {
        (**self).fetch_all(url, sink, cancel)
    }
}

const URL: &str = "https://host/data/f.gz";

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

fn small_opts(connections: usize) -> TransferOptions {
    TransferOptions {
        max_connections_per_server: connections,
        split: 8,
        min_split_size: 1024,
        ..TransferOptions::default()
    }
}

fn downloader(fetcher: &Arc<MemoryFetcher>, opts: TransferOptions) -> SegmentedDownloader<Arc<MemoryFetcher>> {
    SegmentedDownloader::with_fetcher(Arc::clone(fetcher)).options(opts)
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn out_of_order_segments_reassemble_in_order() {
    let data = body(64 * 1024);
    let mut f = MemoryFetcher::new(data.clone());
    f.late_first = true;
    let f = Arc::new(f);
    let dir = tempfile::tempdir().unwrap();

    let result = downloader(&f, small_opts(8))
        .fetch(URL, dir.path(), None)
        .unwrap();

    assert_eq!(result.path, dir.path().join("f.gz"));
    assert_eq!(std::fs::read(&result.path).unwrap(), data);
    assert_eq!(f.requested().len(), 8);
    let finished = f.finished.lock().unwrap().clone();
    let mut sorted = finished.clone();
    sorted.sort();
    assert_ne!(finished, sorted, "segments should have completed out of order");
    assert!(!control_path(&result.path).exists());
}

#[test]
fn filename_override_is_used_verbatim() {
    let data = body(4096);
    let f = Arc::new(MemoryFetcher::new(data.clone()));
    let dir = tempfile::tempdir().unwrap();

    let result = downloader(&f, small_opts(4))
        .fetch(URL, dir.path(), Some("renamed.vcf.gz"))
        .unwrap();
    assert_eq!(result.path, dir.path().join("renamed.vcf.gz"));
    assert_eq!(dir_entries(dir.path()), vec!["renamed.vcf.gz"]);
}

#[test]
fn missing_destination_dir_is_created() {
    let data = body(2048);
    let f = Arc::new(MemoryFetcher::new(data.clone()));
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("nested/cache");

    let result = downloader(&f, small_opts(2)).fetch(URL, &dest, None).unwrap();
    assert_eq!(std::fs::read(result.path).unwrap(), data);
}

#[test]
fn partial_file_prefix_is_kept_and_completed() {
    let data = body(32 * 1024);
    let k = 10_000usize;
    let f = Arc::new(MemoryFetcher::new(data.clone()));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("f.gz");
    // A recognisable prefix: if it survives, [0, k) was not re-fetched.
    let marker = vec![0xEEu8; k];
    std::fs::write(&target, &marker).unwrap();

    downloader(&f, small_opts(4)).fetch(URL, dir.path(), None).unwrap();

    let out = std::fs::read(&target).unwrap();
    assert_eq!(out.len(), data.len());
    assert_eq!(&out[..k], &marker[..]);
    assert_eq!(&out[k..], &data[k..]);
    assert!(f.requested().iter().all(|s| s.start >= k as u64));
    assert_eq!(f.requested()[0].start, k as u64);
}

#[test]
fn rerun_on_complete_file_is_idempotent() {
    let data = body(16 * 1024);
    let f = Arc::new(MemoryFetcher::new(data.clone()));
    let dir = tempfile::tempdir().unwrap();
    let dl = downloader(&f, small_opts(4));

    let first = dl.fetch(URL, dir.path(), None).unwrap();
    let requested_first = f.requested().len();
    let second = dl.fetch(URL, dir.path(), None).unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read(&second.path).unwrap(), data);
    assert_eq!(f.requested().len(), requested_first, "nothing left to fetch");
    assert_eq!(dir_entries(dir.path()), vec!["f.gz"]);
}

#[test]
fn failed_segment_keeps_progress_for_next_run() {
    let data = body(8 * 1024);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("f.gz");

    // One connection processes segments in plan order: 0 and 1 succeed, 2 fails.
    let mut failing = MemoryFetcher::new(data.clone());
    failing.fail_at = Some(2 * 1024);
    let failing = Arc::new(failing);
    let err = downloader(&failing, small_opts(1))
        .fetch(URL, dir.path(), None)
        .unwrap_err();
    match &err {
        FetchError::TransferError { url, diagnostic } => {
            assert_eq!(url, URL);
            assert!(diagnostic.contains("503"));
        }
        other => panic!("expected TransferError, got {:?}", other),
    }

    let state = ResumeState::load(&target)
        .unwrap()
        .into_state()
        .expect("control file kept");
    let bitmap = state.bitmap();
    assert!(bitmap.is_completed(0));
    assert!(bitmap.is_completed(1));
    assert!(!bitmap.is_completed(2));
    let left: Vec<Segment> = bitmap
        .incomplete(&state.segments)
        .into_iter()
        .map(|(_, s)| s)
        .collect();

    let good = Arc::new(MemoryFetcher::new(data.clone()));
    let obs = Arc::new(MemoryObserver::new());
    downloader(&good, small_opts(4))
        .observer(obs.clone())
        .fetch(URL, dir.path(), None)
        .unwrap();

    assert_eq!(good.requested(), left);
    assert!(obs.events().iter().any(|e| matches!(
        e,
        FetchEvent::RequestIssued { detail, .. } if detail.ends_with("resuming at byte 2048")
    )));
    assert_eq!(std::fs::read(&target).unwrap(), data);
    assert!(!control_path(&target).exists());
}

#[test]
fn corrupt_control_file_with_full_length_target_is_refetched() {
    let data = body(16 * 1024);
    let f = Arc::new(MemoryFetcher::new(data.clone()));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("f.gz");
    std::fs::write(&target, vec![0u8; data.len()]).unwrap();
    std::fs::write(control_path(&target), b"{truncated").unwrap();

    downloader(&f, small_opts(4)).fetch(URL, dir.path(), None).unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), data);
    let requested = f.requested();
    assert!(!requested.is_empty());
    assert_eq!(requested[0].start, 0);
    assert_eq!(requested.last().unwrap().end, data.len() as u64);
    assert!(!control_path(&target).exists());
}

#[test]
fn control_file_is_written_before_target_is_extended() {
    let data = body(16 * 1024);
    let f = Arc::new(MemoryFetcher::new(data));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("f.gz");
    // A directory where the temporary control file goes makes the save fail.
    let mut blocker = control_path(&target).into_os_string();
    blocker.push(".tmp");
    std::fs::create_dir(&blocker).unwrap();

    let err = downloader(&f, small_opts(4)).fetch(URL, dir.path(), None).unwrap_err();

    assert!(matches!(err, FetchError::Filesystem { .. }));
    assert_eq!(std::fs::metadata(&target).unwrap().len(), 0);
    assert!(f.requested().is_empty());
}

#[test]
fn server_without_ranges_gets_single_stream() {
    let data = body(5000);
    let mut f = MemoryFetcher::new(data.clone());
    f.ranges = false;
    let f = Arc::new(f);
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f.gz"), b"stale bytes that must go").unwrap();

    let result = downloader(&f, small_opts(4)).fetch(URL, dir.path(), None).unwrap();
    assert_eq!(std::fs::read(result.path).unwrap(), data);
    assert!(f.requested().is_empty());
    assert_eq!(*f.full_gets.lock().unwrap(), 1);
}

#[test]
fn overwrite_disabled_refuses_to_truncate() {
    let data = body(5000);
    let mut f = MemoryFetcher::new(data);
    f.ranges = false;
    let f = Arc::new(f);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("f.gz");
    std::fs::write(&target, b"keep me").unwrap();

    let opts = TransferOptions {
        allow_overwrite: false,
        ..small_opts(4)
    };
    let err = downloader(&f, opts).fetch(URL, dir.path(), None).unwrap_err();
    assert!(matches!(err, FetchError::Filesystem { .. }));
    assert_eq!(std::fs::read(&target).unwrap(), b"keep me");
}

#[test]
fn cancelled_token_stops_transfer() {
    let data = body(8 * 1024);
    let f = Arc::new(MemoryFetcher::new(data));
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let req = DownloadRequest::new(URL, dir.path());
    let err = downloader(&f, small_opts(2)).transfer(&req, &cancel).unwrap_err();
    assert!(matches!(err, FetchError::Cancelled { .. }));
    assert!(control_path(&dir.path().join("f.gz")).exists());
}

#[cfg(unix)]
#[test]
fn concurrent_download_of_same_target_is_refused() {
    let f = Arc::new(MemoryFetcher::new(body(1024)));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("f.gz");

    let mut holder = crate::storage::StorageWriterBuilder::open(&target).unwrap();
    holder.lock().unwrap();

    let err = downloader(&f, small_opts(2)).fetch(URL, dir.path(), None).unwrap_err();
    assert!(matches!(err, FetchError::TargetBusy { .. }));
}

#[test]
fn events_are_reported_to_observer() {
    let f = Arc::new(MemoryFetcher::new(body(2048)));
    let dir = tempfile::tempdir().unwrap();
    let obs = Arc::new(MemoryObserver::new());

    downloader(&f, small_opts(2))
        .observer(obs.clone())
        .fetch(URL, dir.path(), None)
        .unwrap();

    let events = obs.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], FetchEvent::FetchStarted { url: URL.into() });
    assert!(matches!(&events[1], FetchEvent::RequestIssued { detail, .. } if detail.contains("segment")));
    assert_eq!(
        events[2],
        FetchEvent::FetchSucceeded {
            url: URL.into(),
            path: dir.path().join("f.gz"),
        }
    );
}

#[test]
fn failure_is_reported_to_observer() {
    let mut f = MemoryFetcher::new(body(2048));
    f.fail_at = Some(0);
    let f = Arc::new(f);
    let dir = tempfile::tempdir().unwrap();
    let obs = Arc::new(MemoryObserver::new());

    let _ = downloader(&f, small_opts(1))
        .observer(obs.clone())
        .fetch(URL, dir.path(), None);

    assert!(matches!(
        obs.events().last(),
        Some(FetchEvent::FetchFailed { url, .. }) if url == URL
    ));
}
