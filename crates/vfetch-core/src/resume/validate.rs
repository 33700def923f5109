//! Compares a stored control file with the current HEAD result.

use std::fmt;

use crate::fetch_head::HeadResult;

use super::ResumeState;

/// The remote resource no longer matches the control file, so the recorded
/// progress cannot be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteChanged {
    pub etag_changed: bool,
    pub last_modified_changed: bool,
    pub size_changed: bool,
}

impl fmt::Display for RemoteChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut what = Vec::new();
        if self.etag_changed {
            what.push("ETag");
        }
        if self.last_modified_changed {
            what.push("Last-Modified");
        }
        if self.size_changed {
            what.push("size");
        }
        write!(f, "remote resource changed ({})", what.join(", "))
    }
}

impl std::error::Error for RemoteChanged {}

/// Ok if `state` can be resumed against `head`. A validator counts as changed
/// when it differs, or is present on one side only.
pub fn validate_for_resume(state: &ResumeState, head: &HeadResult) -> Result<(), RemoteChanged> {
    fn differs(a: &Option<String>, b: &Option<String>) -> bool {
        match (a, b) {
            (None, None) => false,
            (Some(a), Some(b)) => a != b,
            _ => true,
        }
    }

    let changed = RemoteChanged {
        etag_changed: differs(&state.etag, &head.etag),
        last_modified_changed: differs(&state.last_modified, &head.last_modified),
        size_changed: head.content_length != Some(state.total_size),
    };
    if changed.etag_changed || changed.last_modified_changed || changed.size_changed {
        return Err(changed);
    }
    Ok(())
}
