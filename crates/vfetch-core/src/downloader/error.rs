//! Error from one HTTP request made on behalf of a transfer (probe, segment,
//! or single-stream body).

use std::fmt;

#[derive(Debug)]
pub enum SegmentError {
    /// libcurl reported an error (timeout, connection, TLS, ...).
    Curl(curl::Error),
    /// Non-2xx response.
    Http(u32),
    /// Transfer ended before the expected number of bytes arrived.
    PartialTransfer { expected: u64, received: u64 },
    /// Server sent more than the requested range (it ignored `Range`).
    Overrun { expected: u64 },
    /// A ranged request was answered with something other than 206.
    RangeIgnored { status: u32 },
    /// Writing to the target file failed.
    Storage(std::io::Error),
    Cancelled,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Curl(e) => write!(f, "{}", e),
            SegmentError::Http(code) => write!(f, "HTTP {}", code),
            SegmentError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            SegmentError::Overrun { expected } => {
                write!(f, "server sent more than the {} bytes requested", expected)
            }
            SegmentError::RangeIgnored { status } => {
                write!(f, "range request answered with HTTP {} instead of 206", status)
            }
            SegmentError::Storage(e) => write!(f, "storage: {}", e),
            SegmentError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Curl(e) => Some(e),
            SegmentError::Storage(e) => Some(e),
            _ => None,
        }
    }
}
