//! Concurrent offset writer for the target file.

use std::fs::File;
use std::io;
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Shared handle on the target file. Clone it into each segment worker; every
/// `write_at` is independent (pwrite-style), so segments may land in any order.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
}

impl StorageWriter {
    pub(crate) fn from_file(file: File) -> Self {
        Self { file: Arc::new(file) }
    }

    /// Write all of `data` at `offset` without moving any shared cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Non-Unix: seek + write on a cloned handle. Not safe for concurrent use.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = (*self.file).try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
    }

    /// Cut the file to `len` bytes (used when a single-stream body is shorter
    /// than the preallocated size).
    pub fn set_len(&self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}
