//! libcurl-backed `RangeFetcher`: one easy handle per request.

use std::cell::Cell;
use std::str;
use std::time::Duration;

use crate::control::CancelToken;
use crate::fetch_head::{self, HeadResult};
use crate::segmenter::Segment;

use super::fetcher::{RangeFetcher, Sink};
use super::SegmentError;

/// Abort a request whose throughput stays below `LOW_SPEED_LIMIT` bytes/s for
/// `LOW_SPEED_TIME`. There is no wall-clock limit: a 1.5 GiB segment on a slow
/// link may legitimately take hours.
const LOW_SPEED_LIMIT: u32 = 1024;
const LOW_SPEED_TIME: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Clone, Copy)]
pub struct CurlFetcher;

impl CurlFetcher {
    pub fn new() -> Self {
        Self
    }

    fn get(
        url: &str,
        range: Option<&Segment>,
        sink: &mut Sink<'_>,
        cancel: &CancelToken,
    ) -> Result<(), SegmentError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(SegmentError::Curl)?;
        easy.follow_location(true).map_err(SegmentError::Curl)?;
        easy.max_redirections(10).map_err(SegmentError::Curl)?;
        // Error bodies (>= 400) must never reach the sink.
        easy.fail_on_error(true).map_err(SegmentError::Curl)?;
        easy.connect_timeout(CONNECT_TIMEOUT)
            .map_err(SegmentError::Curl)?;
        easy.low_speed_limit(LOW_SPEED_LIMIT)
            .map_err(SegmentError::Curl)?;
        easy.low_speed_time(LOW_SPEED_TIME)
            .map_err(SegmentError::Curl)?;
        // Needed for the progress callback, which is how cancellation reaches
        // a stalled transfer.
        easy.progress(true).map_err(SegmentError::Curl)?;
        if let Some(segment) = range {
            easy.range(&segment.curl_range()).map_err(SegmentError::Curl)?;
        }

        // Status of the latest response; redirects send several.
        let status: Cell<Option<u32>> = Cell::new(None);
        let mut sink_error: Option<SegmentError> = None;
        let perform_result = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|line| {
                    if let Some(code) = str::from_utf8(line).ok().and_then(fetch_head::status_code) {
                        status.set(Some(code));
                    }
                    true
                })
                .map_err(SegmentError::Curl)?;
            transfer
                .write_function(|data| {
                    if cancel.is_cancelled() {
                        sink_error = Some(SegmentError::Cancelled);
                        return Ok(0);
                    }
                    // A 200 to a ranged request is the whole body from byte 0.
                    if range.is_some() && status.get() != Some(206) {
                        sink_error = Some(SegmentError::RangeIgnored {
                            status: status.get().unwrap_or(0),
                        });
                        return Ok(0);
                    }
                    match sink(data) {
                        Ok(()) => Ok(data.len()),
                        Err(e) => {
                            sink_error = Some(e);
                            Ok(0)
                        }
                    }
                })
                .map_err(SegmentError::Curl)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(SegmentError::Curl)?;
            transfer.perform()
        };

        if let Err(e) = perform_result {
            if let Some(inner) = sink_error {
                return Err(inner);
            }
            if e.is_aborted_by_callback() {
                return Err(SegmentError::Cancelled);
            }
            if e.is_http_returned_error() {
                let code = easy.response_code().map_err(SegmentError::Curl)?;
                return Err(SegmentError::Http(code));
            }
            return Err(SegmentError::Curl(e));
        }

        let code = easy.response_code().map_err(SegmentError::Curl)?;
        if !(200..300).contains(&code) {
            return Err(SegmentError::Http(code));
        }
        if range.is_some() && code != 206 {
            return Err(SegmentError::RangeIgnored { status: code });
        }
        Ok(())
    }
}

impl RangeFetcher for CurlFetcher {
    fn probe(&self, url: &str) -> Result<HeadResult, SegmentError> {
        fetch_head::probe(url)
    }

    fn fetch_range(
        &self,
        url: &str,
        segment: &Segment,
        sink: &mut Sink<'_>,
        cancel: &CancelToken,
    ) -> Result<(), SegmentError> {
        Self::get(url, Some(segment), sink, cancel)
    }

    fn fetch_all(
        &self,
        url: &str,
        sink: &mut Sink<'_>,
        cancel: &CancelToken,
    ) -> Result<(), SegmentError> {
        Self::get(url, None, sink, cancel)
    }
}
