//! One segment: fetch its range and write it at its offset.

use crate::control::CancelToken;
use crate::segmenter::Segment;
use crate::storage::StorageWriter;

use super::fetcher::RangeFetcher;
use super::SegmentError;

/// Fetches `segment` and writes it into `storage` at the segment's own offset.
/// Exactly `segment.len()` bytes must arrive.
pub(super) fn download_one_segment<F: RangeFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    segment: &Segment,
    storage: &StorageWriter,
    cancel: &CancelToken,
) -> Result<(), SegmentError> {
    let expected = segment.len();
    let mut received = 0u64;
    fetcher.fetch_range(
        url,
        segment,
        &mut |data: &[u8]| {
            let len = data.len() as u64;
            if received + len > expected {
                return Err(SegmentError::Overrun { expected });
            }
            storage
                .write_at(segment.start + received, data)
                .map_err(SegmentError::Storage)?;
            received += len;
            Ok(())
        },
        cancel,
    )?;

    if received != expected {
        return Err(SegmentError::PartialTransfer { expected, received });
    }
    Ok(())
}

/// Streams the whole body into `storage` from offset 0. Returns bytes written.
pub(super) fn download_whole<F: RangeFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    storage: &StorageWriter,
    expected_len: Option<u64>,
    cancel: &CancelToken,
) -> Result<u64, SegmentError> {
    let mut written = 0u64;
    fetcher.fetch_all(
        url,
        &mut |data: &[u8]| {
            let len = data.len() as u64;
            if let Some(exp) = expected_len {
                if written + len > exp {
                    return Err(SegmentError::Overrun { expected: exp });
                }
            }
            storage.write_at(written, data).map_err(SegmentError::Storage)?;
            written += len;
            Ok(())
        },
        cancel,
    )?;

    if let Some(exp) = expected_len {
        if written != exp {
            return Err(SegmentError::PartialTransfer {
                expected: exp,
                received: written,
            });
        }
    }
    Ok(written)
}
