//! Filename extraction from URL path.

/// Extracts the last path segment from a URL for use as the local filename.
///
/// Query and fragment are ignored. Returns `None` if the URL cannot be parsed
/// or the path is empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
