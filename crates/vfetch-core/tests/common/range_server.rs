//! Minimal HTTP/1.1 server for integration tests: HEAD and Range GET over a
//! fixed set of paths.
//!
//! HEAD answers with Content-Length, an ETag and (optionally)
//! `Accept-Ranges: bytes`; a GET with Range answers 206 unless the server is
//! told to ignore ranges. Unknown paths are 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD omits `Accept-Ranges` and GET ignores Range.
    pub support_ranges: bool,
    /// If false, GET answers 200 with the full body even though HEAD
    /// advertised ranges.
    pub honor_ranges: bool,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            honor_ranges: true,
        }
    }
}

/// A running server. Requests are recorded as `"METHOD /path range"`.
pub struct RangeServer {
    base: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl RangeServer {
    /// `http://127.0.0.1:PORT/` + `path` (given without leading slash).
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

/// Serves each `(path, body)` pair. Runs until the process exits.
pub fn start(files: Vec<(&str, Vec<u8>)>) -> RangeServer {
    start_with_options(files, RangeServerOptions::default())
}

pub fn start_with_options(files: Vec<(&str, Vec<u8>)>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files: Arc<HashMap<String, Vec<u8>>> = Arc::new(
        files
            .into_iter()
            .map(|(p, b)| (format!("/{}", p.trim_start_matches('/')), b))
            .collect(),
    );
    let log = Arc::new(Mutex::new(Vec::new()));
    let server_log = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let log = Arc::clone(&server_log);
            thread::spawn(move || handle(stream, &files, &log, opts));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}", port),
        log,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    files: &HashMap<String, Vec<u8>>,
    log: &Mutex<Vec<String>>,
    opts: RangeServerOptions,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (method, path, range) = parse_request(request);
    log.lock().unwrap().push(format!(
        "{} {} {}",
        method,
        path,
        range.map(|(a, b)| format!("{}-{}", a, b)).unwrap_or_default()
    ));

    let Some(body) = files.get(path) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return;
    };
    let total = body.len() as u64;
    let accept_ranges = if opts.support_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };
    let etag = format!("ETag: \"{}-{}\"\r\n", path.len(), total);

    if method.eq_ignore_ascii_case("HEAD") {
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}{}\r\n",
            total, etag, accept_ranges
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let ranged = range.filter(|_| opts.support_ranges && opts.honor_ranges);
    let (status, content_range, slice) = match ranged {
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl || start >= total {
                (
                    "416 Range Not Satisfiable",
                    format!("Content-Range: bytes */{}\r\n", total),
                    &body[0..0],
                )
            } else {
                (
                    "206 Partial Content",
                    format!("Content-Range: bytes {}-{}/{}\r\n", start, end_incl, total),
                    &body[start as usize..=end_incl as usize],
                )
            }
        }
        None => ("200 OK", String::new(), &body[..]),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}{}\r\n",
        status,
        slice.len(),
        content_range,
        etag,
        accept_ranges
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// `(method, path, Range: bytes=X-Y as (X, Y inclusive))`.
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("range") {
            continue;
        }
        let value = value.trim();
        if let Some(spec) = value.strip_prefix("bytes=") {
            if let Some((a, b)) = spec.split_once('-') {
                let start = a.trim().parse::<u64>().unwrap_or(0);
                let end = b.trim().parse::<u64>().unwrap_or(u64::MAX);
                range = Some((start, end));
            }
        }
    }
    (method, path, range)
}
