//! Network side of the segmented downloader.

use crate::control::CancelToken;
use crate::fetch_head::HeadResult;
use crate::segmenter::Segment;

use super::SegmentError;

/// Receives body bytes in order; returning an error aborts the request.
pub type Sink<'a> = dyn FnMut(&[u8]) -> Result<(), SegmentError> + 'a;

/// What the segmented downloader needs from the network. Implementations are
/// shared across segment workers, so they must be `Sync`.
pub trait RangeFetcher: Send + Sync {
    /// Learn size, range support and validators of `url`.
    fn probe(&self, url: &str) -> Result<HeadResult, SegmentError>;

    /// Stream bytes `[segment.start, segment.end)` of `url` into `sink`.
    fn fetch_range(
        &self,
        url: &str,
        segment: &Segment,
        sink: &mut Sink<'_>,
        cancel: &CancelToken,
    ) -> Result<(), SegmentError>;

    /// Stream the whole body of `url` into `sink` (no `Range`).
    fn fetch_all(
        &self,
        url: &str,
        sink: &mut Sink<'_>,
        cancel: &CancelToken,
    ) -> Result<(), SegmentError>;
}
