//! Range math and segment planning.
//!
//! Splits the still-missing byte range of a file into segments and tracks
//! which of them are done.

mod bitmap;
mod range;

pub use bitmap::SegmentBitmap;
pub use range::{plan_range, segment_count_for, Segment};
