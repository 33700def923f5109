//! Segment type and range planning.

use serde::{Deserialize, Serialize};

/// A single segment: byte range [start, end) (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
}

impl Segment {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// libcurl range string (inclusive end, no `bytes=` prefix): `start-(end-1)`.
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end.saturating_sub(1))
    }
}

/// Number of segments for `remaining` bytes: as many as `split` allows while
/// keeping each at least `min_split_size`, never fewer than one.
pub fn segment_count_for(remaining: u64, split: usize, min_split_size: u64) -> usize {
    if remaining == 0 {
        return 0;
    }
    let by_size = remaining / min_split_size.max(1);
    (by_size.min(split.max(1) as u64)).max(1) as usize
}

/// Splits `[start, end)` into `count` contiguous segments, as equal as possible
/// (earlier segments take the remainder). Empty if the range is empty or
/// `count` is 0.
pub fn plan_range(start: u64, end: u64, count: usize) -> Vec<Segment> {
    if end <= start || count == 0 {
        return Vec::new();
    }
    let total = end - start;
    let count = (count as u64).min(total);
    let base = total / count;
    let remainder = total % count;

    let mut out = Vec::with_capacity(count as usize);
    let mut offset = start;
    for i in 0..count {
        let len = base + if i < remainder { 1 } else { 0 };
        out.push(Segment {
            start: offset,
            end: offset + len,
        });
        offset += len;
    }
    out
}
