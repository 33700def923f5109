//! Segment completion bitmap for resume.

use super::Segment;

/// One bit per segment (LSB of byte 0 = segment 0).
///
/// Persisted as raw bytes in the resume control file; only the first
/// `ceil(segment_count/8)` bytes are significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentBitmap {
    bytes: Vec<u8>,
}

impl SegmentBitmap {
    pub fn new(segment_count: usize) -> Self {
        SegmentBitmap {
            bytes: vec![0u8; segment_count.div_ceil(8)],
        }
    }

    /// Extra bytes are ignored; missing bytes read as "not completed".
    pub fn from_bytes(bytes: &[u8], segment_count: usize) -> Self {
        let mut b = vec![0u8; segment_count.div_ceil(8)];
        let copy = bytes.len().min(b.len());
        b[..copy].copy_from_slice(&bytes[..copy]);
        SegmentBitmap { bytes: b }
    }

    pub fn to_bytes(&self, segment_count: usize) -> Vec<u8> {
        let len = segment_count.div_ceil(8);
        self.bytes.get(..len).unwrap_or(&self.bytes).to_vec()
    }

    pub fn set_completed(&mut self, index: usize) {
        let byte_idx = index / 8;
        if byte_idx >= self.bytes.len() {
            self.bytes.resize(byte_idx + 1, 0);
        }
        self.bytes[byte_idx] |= 1 << (index % 8);
    }

    pub fn is_completed(&self, index: usize) -> bool {
        self.bytes
            .get(index / 8)
            .map(|&b| (b & (1 << (index % 8))) != 0)
            .unwrap_or(false)
    }

    pub fn all_completed(&self, segment_count: usize) -> bool {
        (0..segment_count).all(|i| self.is_completed(i))
    }

    /// Segments still to fetch, with their plan index.
    pub fn incomplete(&self, segments: &[Segment]) -> Vec<(usize, Segment)> {
        segments
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_completed(*i))
            .map(|(i, s)| (i, *s))
            .collect()
    }

    /// Bytes covered by completed segments.
    pub fn completed_bytes(&self, segments: &[Segment]) -> u64 {
        segments
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_completed(*i))
            .map(|(_, s)| s.len())
            .sum()
    }
}
