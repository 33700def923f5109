//! HTTP HEAD / metadata probing.
//!
//! Uses libcurl to fetch response headers and learn `Content-Length`,
//! `Accept-Ranges: bytes`, and ETag/Last-Modified for resume safety.

mod parse;

pub(crate) use parse::{parse_headers, status_code};

use std::str;
use std::time::Duration;

use crate::downloader::SegmentError;

/// Key headers needed for planning a segmented download and validating a resume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl HeadResult {
    /// Size to plan segments against, if ranged retrieval is possible.
    pub fn ranged_size(&self) -> Option<u64> {
        if self.accept_ranges {
            self.content_length
        } else {
            None
        }
    }
}

/// Performs a HEAD request (following redirects) and returns parsed metadata.
/// Blocking.
pub fn probe(url: &str) -> Result<HeadResult, SegmentError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(SegmentError::Curl)?;
    easy.nobody(true).map_err(SegmentError::Curl)?;
    easy.follow_location(true).map_err(SegmentError::Curl)?;
    easy.connect_timeout(Duration::from_secs(15))
        .map_err(SegmentError::Curl)?;
    easy.timeout(Duration::from_secs(60))
        .map_err(SegmentError::Curl)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    headers.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(SegmentError::Curl)?;
        transfer.perform().map_err(SegmentError::Curl)?;
    }

    let code = easy.response_code().map_err(SegmentError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(SegmentError::Http(code));
    }

    Ok(parse_headers(&headers))
}
