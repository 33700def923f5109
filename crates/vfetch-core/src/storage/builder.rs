//! Opening, locking and preallocating the target file.

use std::fs::File;
use std::io;
use std::path::Path;

use super::writer::StorageWriter;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Prepares the target file. Call `lock`, then `truncate` (fresh download) or
/// nothing (resume), then `preallocate`, then `build`.
pub struct StorageWriterBuilder {
    file: File,
}

impl StorageWriterBuilder {
    /// Open `path` for read+write, creating it if missing. Never truncates, so
    /// a partial file from an earlier run keeps its bytes until `truncate`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(StorageWriterBuilder { file })
    }

    /// Take an exclusive, non-blocking advisory lock on the file. Fails with
    /// `WouldBlock` if another download holds it. Released when the last
    /// handle is dropped.
    #[cfg(unix)]
    pub fn lock(&mut self) -> io::Result<()> {
        let r = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if r == 0 {
            return Ok(());
        }
        Err(io::Error::last_os_error())
    }

    #[cfg(not(unix))]
    pub fn lock(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Discard existing content.
    pub fn truncate(&mut self) -> io::Result<()> {
        self.file.set_len(0)
    }

    /// Ensure the file spans `size` bytes. Existing bytes are untouched. On
    /// Linux tries `posix_fallocate` for real block allocation; falls back to
    /// `set_len`.
    pub fn preallocate(&mut self, size: u64) -> io::Result<()> {
        #[cfg(target_os = "linux")]
        {
            let fd = self.file.as_raw_fd();
            let r = if size > 0 {
                unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) }
            } else {
                0
            };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        if self.file.metadata()?.len() < size {
            self.file.set_len(size)?;
        }
        Ok(())
    }

    /// Finish building and return a writer that can be shared for concurrent writes.
    pub fn build(self) -> StorageWriter {
        StorageWriter::from_file(self.file)
    }
}
