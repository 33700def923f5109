//! Decides how a transfer proceeds given the remote metadata and what is
//! already on disk.

use crate::fetch_head::HeadResult;
use crate::resume::{validate_for_resume, ControlFile, ResumeState};
use crate::segmenter::{plan_range, segment_count_for};
use crate::transport::TransferOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransferPlan {
    /// Ranged download. `state` holds the plan; incomplete segments in its
    /// bitmap are fetched. `truncate` discards existing bytes first.
    Segmented { state: ResumeState, truncate: bool },
    /// One plain GET from byte 0 into a truncated file.
    Single { expected_len: Option<u64> },
}

impl TransferPlan {
    /// True when existing bytes at the target are thrown away.
    pub(crate) fn discards_existing(&self) -> bool {
        match self {
            TransferPlan::Segmented { truncate, .. } => *truncate,
            TransferPlan::Single { .. } => true,
        }
    }
}

/// Builds the plan.
///
/// * `stored`: the control file next to the target.
/// * `existing_len`: length of the target file, if it exists.
///
/// Resume order of preference: a control file that still matches the remote
/// and the on-disk size; else, only when there is no control file at all, a
/// bare partial file whose length is the resume offset; else start over.
pub(crate) fn plan_transfer(
    url: &str,
    head: &HeadResult,
    opts: &TransferOptions,
    stored: ControlFile,
    existing_len: Option<u64>,
) -> TransferPlan {
    let Some(total) = head.ranged_size() else {
        return TransferPlan::Single {
            expected_len: head.content_length,
        };
    };

    let fresh = |start: u64| {
        let count = segment_count_for(total - start, opts.split, opts.min_split_size);
        ResumeState::new(url, head, total, plan_range(start, total, count))
    };

    if opts.continue_partial {
        match stored {
            ControlFile::Found(state) => {
                let usable = state.segments.last().map(|s| s.end) == Some(total)
                    && existing_len == Some(total);
                match validate_for_resume(&state, head) {
                    Ok(()) if usable => {
                        return TransferPlan::Segmented {
                            state,
                            truncate: false,
                        }
                    }
                    Ok(()) => {
                        tracing::warn!(%url, "control file does not match the file on disk, restarting")
                    }
                    Err(changed) => tracing::warn!(%url, "{}, restarting", changed),
                }
            }
            ControlFile::Unreadable => {
                tracing::warn!(%url, "control file unreadable, restarting")
            }
            ControlFile::Missing => {
                if let Some(k) = existing_len.filter(|&k| k <= total) {
                    return TransferPlan::Segmented {
                        state: fresh(k),
                        truncate: false,
                    };
                }
            }
        }
    }

    TransferPlan::Segmented {
        state: fresh(0),
        truncate: true,
    }
}

/// Bytes still to fetch under `state`.
pub(crate) fn remaining_bytes(state: &ResumeState) -> u64 {
    let done = state.bitmap().completed_bytes(&state.segments);
    let planned: u64 = state.segments.iter().map(|s| s.len()).sum();
    planned - done
}
