//! URL modeling and filename derivation.
//!
//! The local name is either the caller's override or the last URL path
//! segment. Names are used verbatim; anything that is not a single plain
//! path component is rejected rather than rewritten.

mod path;

pub use path::filename_from_url_path;

/// Checks that `name` is one plain path component usable as-is.
pub fn check_plain_filename(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("filename is empty");
    }
    if name == "." || name == ".." {
        return Err("filename is a reserved name");
    }
    if name.contains('/') || name.contains('\\') {
        return Err("filename contains a path separator");
    }
    if name.chars().any(|c| c == '\0' || c.is_control()) {
        return Err("filename contains control characters");
    }
    Ok(())
}

/// Resolves the local filename: the override if given, else the URL basename.
pub fn resolve_filename(url: &str, filename: Option<&str>) -> Result<String, &'static str> {
    let name = match filename {
        Some(f) => f.to_string(),
        None => filename_from_url_path(url).ok_or("URL has no final path segment")?,
    };
    check_plain_filename(&name)?;
    Ok(name)
}
