//! Error taxonomy shared by transports and the job orchestrator.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport cannot be invoked at all (e.g. `aria2c` not installed).
    #[error("{tool} is unavailable: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    /// The transport ran and reported failure.
    #[error("failed to download {url}: {diagnostic}")]
    TransferError { url: String, diagnostic: String },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    /// Another invocation holds the lock on the target file.
    #[error("{} is being written by another download", path.display())]
    TargetBusy { path: PathBuf },

    #[error("download of {url} cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transfer(url: &str, diagnostic: impl Into<String>) -> Self {
        FetchError::TransferError {
            url: url.to_string(),
            diagnostic: diagnostic.into(),
        }
    }

    /// URL this error refers to, when it is tied to a single transfer.
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::TransferError { url, .. }
            | FetchError::InvalidRequest { url, .. }
            | FetchError::Cancelled { url } => Some(url),
            _ => None,
        }
    }
}
