//! Local cache directory that downloaded files are written to.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Where downloads land. Either an explicit directory or the XDG cache home
/// (`~/.cache/vfetch`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    Xdg,
    Explicit(PathBuf),
}

impl CacheLocation {
    pub fn from_override(dir: Option<PathBuf>) -> Self {
        match dir {
            Some(d) => CacheLocation::Explicit(d),
            None => CacheLocation::Xdg,
        }
    }

    /// Create the directory if needed (`mkdir -p`) and return its absolute path.
    /// Calling it repeatedly is harmless.
    pub fn resolve(&self) -> Result<PathBuf, FetchError> {
        let dir = match self {
            CacheLocation::Explicit(d) => d.clone(),
            CacheLocation::Xdg => xdg::BaseDirectories::with_prefix("vfetch")
                .map_err(|e| {
                    FetchError::filesystem(
                        "$XDG_CACHE_HOME",
                        std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()),
                    )
                })?
                .get_cache_home()
                .join("vfetch"),
        };
        ensure_dir(&dir)
    }
}

/// `mkdir -p` then canonicalize.
pub fn ensure_dir(dir: &Path) -> Result<PathBuf, FetchError> {
    fs::create_dir_all(dir).map_err(|e| FetchError::filesystem(dir, e))?;
    let abs = dir
        .canonicalize()
        .map_err(|e| FetchError::filesystem(dir, e))?;
    if !abs.is_dir() {
        return Err(FetchError::filesystem(
            &abs,
            std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
        ));
    }
    Ok(abs)
}
