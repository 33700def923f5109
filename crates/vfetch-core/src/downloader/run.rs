//! Bounded worker pool for segment downloads.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;

use crate::control::CancelToken;
use crate::segmenter::{Segment, SegmentBitmap};
use crate::storage::StorageWriter;

use super::fetcher::RangeFetcher;
use super::segment::download_one_segment;
use super::SegmentError;

/// Persist progress after this many completed segments.
pub(super) const COALESCE_PROGRESS_EVERY: usize = 2;

/// Runs `incomplete` segments on at most `max_concurrent` workers. Results are
/// handled as they arrive, in whatever order segments finish; each success
/// sets its bit in `bitmap` and `on_progress` is called every few completions
/// and once at the end.
///
/// On the first failure the queue is drained, in-flight segments finish, and
/// that failure is returned with its segment index.
pub(super) fn run_segments<F: RangeFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    storage: &StorageWriter,
    incomplete: Vec<(usize, Segment)>,
    max_concurrent: usize,
    cancel: &CancelToken,
    bitmap: &mut SegmentBitmap,
    mut on_progress: impl FnMut(&SegmentBitmap),
) -> Result<(), (usize, SegmentError)> {
    if incomplete.is_empty() {
        return Ok(());
    }
    let num_workers = max_concurrent.max(1).min(incomplete.len());
    let work: Mutex<VecDeque<(usize, Segment)>> = Mutex::new(incomplete.into_iter().collect());
    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<(usize, Result<(), SegmentError>)>();

    thread::scope(|s| {
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            let stop = &stop;
            s.spawn(move || loop {
                if stop.load(Ordering::Relaxed) || cancel.is_cancelled() {
                    break;
                }
                let next = match work.lock() {
                    Ok(mut q) => q.pop_front(),
                    Err(_) => None,
                };
                let Some((index, segment)) = next else {
                    break;
                };
                let res = download_one_segment(fetcher, url, &segment, storage, cancel);
                if tx.send((index, res)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        let mut first_error: Option<(usize, SegmentError)> = None;
        let mut completed_since_persist = 0usize;
        // Ends once every worker has exited and dropped its sender.
        for (index, res) in rx {
            match res {
                Ok(()) => {
                    bitmap.set_completed(index);
                    completed_since_persist += 1;
                    if completed_since_persist >= COALESCE_PROGRESS_EVERY {
                        on_progress(bitmap);
                        completed_since_persist = 0;
                    }
                }
                Err(e) => {
                    tracing::debug!(segment = index, "segment failed: {}", e);
                    stop.store(true, Ordering::Relaxed);
                    if first_error.is_none() {
                        first_error = Some((index, e));
                    }
                }
            }
        }
        if completed_since_persist > 0 {
            on_progress(bitmap);
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        let unstarted = work
            .lock()
            .ok()
            .and_then(|q| q.front().map(|(i, _)| *i));
        match unstarted {
            Some(index) if cancel.is_cancelled() => Err((index, SegmentError::Cancelled)),
            _ => Ok(()),
        }
    })
}
