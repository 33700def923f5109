//! Control file (de)serialization.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::fetch_head::HeadResult;
use crate::segmenter::{Segment, SegmentBitmap};

/// Suffix appended to the target path to name its control file.
pub const CONTROL_SUFFIX: &str = ".vfetch";

/// `file.gz` → `file.gz.vfetch`.
pub fn control_path(target: &Path) -> PathBuf {
    let mut o = target.as_os_str().to_owned();
    o.push(CONTROL_SUFFIX);
    PathBuf::from(o)
}

/// What sits next to the target when a transfer starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFile {
    Missing,
    /// Present but unreadable or not valid JSON. Progress is unknown, so the
    /// target's bytes cannot be trusted either.
    Unreadable,
    Found(ResumeState),
}

impl ControlFile {
    pub fn into_state(self) -> Option<ResumeState> {
        match self {
            ControlFile::Found(state) => Some(state),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub url: String,
    pub total_size: u64,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    pub segments: Vec<Segment>,
    /// Completion bitmap bytes (see `SegmentBitmap::to_bytes`).
    #[serde(default)]
    pub completed: Vec<u8>,
}

impl ResumeState {
    pub fn new(url: &str, head: &HeadResult, total_size: u64, segments: Vec<Segment>) -> Self {
        let completed = SegmentBitmap::new(segments.len()).to_bytes(segments.len());
        Self {
            url: url.to_string(),
            total_size,
            etag: head.etag.clone(),
            last_modified: head.last_modified.clone(),
            segments,
            completed,
        }
    }

    pub fn bitmap(&self) -> SegmentBitmap {
        SegmentBitmap::from_bytes(&self.completed, self.segments.len())
    }

    pub fn set_bitmap(&mut self, bitmap: &SegmentBitmap) {
        self.completed = bitmap.to_bytes(self.segments.len());
    }

    /// Load the control file for `target`. A corrupt one is logged and
    /// reported as `Unreadable`.
    pub fn load(target: &Path) -> io::Result<ControlFile> {
        let path = control_path(target);
        let data = match fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ControlFile::Missing),
            Err(e) => return Err(e),
        };
        match serde_json::from_slice::<ResumeState>(&data) {
            Ok(state) => Ok(ControlFile::Found(state)),
            Err(e) => {
                tracing::warn!(path = %path.display(), "corrupt control file: {}", e);
                Ok(ControlFile::Unreadable)
            }
        }
    }

    /// Write the control file via a temp file and rename, so a crash never
    /// leaves a half-written one.
    pub fn save(&self, target: &Path) -> io::Result<()> {
        let path = control_path(target);
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let data = serde_json::to_vec(self).map_err(io::Error::other)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)
    }

    /// Remove the control file for `target`; absent is fine.
    pub fn remove(target: &Path) -> io::Result<()> {
        match fs::remove_file(control_path(target)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
