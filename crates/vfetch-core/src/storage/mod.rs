//! Disk I/O for the target file.
//!
//! The file is written in place at its final path: opened without truncation,
//! locked against concurrent writers, optionally truncated, preallocated
//! (fallocate on Linux when available, else set_len), then shared between
//! segment workers for offset writes (pwrite).

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

/// Length of the file at `path`, or `None` if it does not exist.
pub fn existing_len(path: &std::path::Path) -> std::io::Result<Option<u64>> {
    match std::fs::metadata(path) {
        Ok(m) => Ok(Some(m.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
