//! `aria2c` as an external transport.
//!
//! The binary is resolved once with `which`, then run per file with the
//! segmented/resume knobs translated to its command-line flags. Output is
//! always named explicitly (`--out`) and auto-renaming is off, so the target
//! path is the same one `SegmentedDownloader` would use.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache;
use crate::control::CancelToken;
use crate::error::FetchError;
use crate::observer::{FetchEvent, FetchObserver, TracingObserver};
use crate::transport::{DownloadRequest, DownloadResult, TransferOptions, Transport};

pub const ARIA2C: &str = "aria2c";

/// How often a running `aria2c` is checked for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lines of stdout kept for a diagnostic when stderr is empty.
const STDOUT_TAIL_LINES: usize = 20;

pub struct Aria2Transport {
    program: PathBuf,
    options: TransferOptions,
    observer: Arc<dyn FetchObserver>,
}

impl Aria2Transport {
    /// Finds `aria2c` on `PATH`.
    pub fn locate() -> Result<Self, FetchError> {
        Self::with_program(ARIA2C)
    }

    /// Uses `program` (a name looked up on `PATH`, or a path to an executable).
    pub fn with_program(program: impl AsRef<Path>) -> Result<Self, FetchError> {
        let program = program.as_ref();
        let resolved = which::which(program).map_err(|e| FetchError::ToolUnavailable {
            tool: program.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!("using {}", resolved.display());
        Ok(Self {
            program: resolved,
            options: TransferOptions::default(),
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for one file, URL last.
    pub fn arguments(&self, dir: &Path, filename: &str, url: &str) -> Vec<String> {
        let o = &self.options;
        vec![
            format!("--dir={}", dir.display()),
            format!("--max-connection-per-server={}", o.max_connections_per_server),
            format!("--split={}", o.split),
            format!("--min-split-size={}", size_flag(o.min_split_size)),
            format!("--continue={}", o.continue_partial),
            format!("--allow-overwrite={}", o.allow_overwrite),
            "--auto-file-renaming=false".to_string(),
            format!("--out={}", filename),
            url.to_string(),
        ]
    }

    fn run(&self, request: &DownloadRequest, cancel: &CancelToken) -> Result<PathBuf, FetchError> {
        let url = request.url.as_str();
        let target = request.target_path()?;
        let dir = cache::ensure_dir(&request.destination_dir)?;
        let filename = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let args = self.arguments(&dir, &filename, url);

        self.observer.on_event(&FetchEvent::RequestIssued {
            url: url.to_string(),
            detail: format!("{} {}", self.program.display(), args.join(" ")),
        });

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                url: url.to_string(),
            });
        }

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FetchError::ToolUnavailable {
                tool: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (status, out, err) = thread::scope(|s| {
            let out = s.spawn(move || drain(stdout));
            let err = s.spawn(move || drain(stderr));
            let status = wait_or_kill(&mut child, cancel);
            (
                status,
                out.join().unwrap_or_default(),
                err.join().unwrap_or_default(),
            )
        });

        let status = status.map_err(|e| FetchError::transfer(url, format!("waiting for aria2c: {}", e)))?;
        let Some(status) = status else {
            return Err(FetchError::Cancelled {
                url: url.to_string(),
            });
        };

        if !status.success() {
            return Err(FetchError::transfer(url, failure_diagnostic(status, &out, &err)));
        }
        if !out.trim().is_empty() {
            tracing::debug!(%url, "aria2c output: {}", tail(&out, STDOUT_TAIL_LINES));
        }
        if !target.is_file() {
            return Err(FetchError::transfer(
                url,
                format!("aria2c exited successfully but {} is missing", target.display()),
            ));
        }
        Ok(target)
    }
}

impl Transport for Aria2Transport {
    fn transfer(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
    ) -> Result<DownloadResult, FetchError> {
        self.observer.on_event(&FetchEvent::FetchStarted {
            url: request.url.clone(),
        });
        match self.run(request, cancel) {
            Ok(path) => {
                self.observer.on_event(&FetchEvent::FetchSucceeded {
                    url: request.url.clone(),
                    path: path.clone(),
                });
                Ok(DownloadResult { path })
            }
            Err(e) => {
                self.observer.on_event(&FetchEvent::FetchFailed {
                    url: request.url.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

/// `aria2c` size syntax: `1M`, `512K`, or plain bytes.
fn size_flag(bytes: u64) -> String {
    const K: u64 = 1024;
    const M: u64 = 1024 * 1024;
    if bytes >= M && bytes % M == 0 {
        format!("{}M", bytes / M)
    } else if bytes >= K && bytes % K == 0 {
        format!("{}K", bytes / K)
    } else {
        bytes.to_string()
    }
}

fn drain(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut p) = pipe {
        let _ = p.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// `Ok(None)` when the child was killed because `cancel` fired.
fn wait_or_kill(child: &mut Child, cancel: &CancelToken) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn failure_diagnostic(status: ExitStatus, stdout: &str, stderr: &str) -> String {
    let detail = if stderr.trim().is_empty() {
        tail(stdout, STDOUT_TAIL_LINES)
    } else {
        stderr.trim().to_string()
    };
    format!("aria2c exited with {}: {}", status, detail)
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::MemoryObserver;

    #[test]
    fn size_flag_units() {
        assert_eq!(size_flag(1024 * 1024), "1M");
        assert_eq!(size_flag(20 * 1024 * 1024), "20M");
        assert_eq!(size_flag(64 * 1024), "64K");
        assert_eq!(size_flag(1000), "1000");
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("", 2), "");
    }

    #[test]
    fn missing_tool_is_unavailable() {
        let err = Aria2Transport::with_program("/nonexistent/dir/aria2c").err().unwrap();
        assert!(matches!(err, FetchError::ToolUnavailable { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        const WRITE_OUT: &str = r#"
for arg in "$@"; do
  case "$arg" in
    --dir=*) dir="${arg#--dir=}" ;;
    --out=*) out="${arg#--out=}" ;;
  esac
done
printf 'payload' > "$dir/$out"
"#;

        #[test]
        fn default_arguments_match_reference_flags() {
            let bin = tempfile::tempdir().unwrap();
            let t = Aria2Transport::with_program(script(bin.path(), "aria2c", "exit 0")).unwrap();
            let args = t.arguments(Path::new("/cache"), "f.gz", "https://host/f.gz");
            assert_eq!(
                args,
                vec![
                    "--dir=/cache",
                    "--max-connection-per-server=16",
                    "--split=16",
                    "--min-split-size=1M",
                    "--continue=true",
                    "--allow-overwrite=true",
                    "--auto-file-renaming=false",
                    "--out=f.gz",
                    "https://host/f.gz",
                ]
            );
        }

        #[test]
        fn successful_run_returns_target() {
            let bin = tempfile::tempdir().unwrap();
            let dest = tempfile::tempdir().unwrap();
            let obs = Arc::new(MemoryObserver::new());
            let t = Aria2Transport::with_program(script(bin.path(), "aria2c", WRITE_OUT))
                .unwrap()
                .observer(obs.clone());

            let req = DownloadRequest::new("https://host/data/f.gz.tbi", dest.path());
            let result = t.transfer(&req, &CancelToken::new()).unwrap();

            let expected = dest.path().join("f.gz.tbi");
            assert_eq!(result.path, expected);
            assert_eq!(std::fs::read(&expected).unwrap(), b"payload");

            let events = obs.events();
            assert!(matches!(&events[1], FetchEvent::RequestIssued { detail, .. }
                if detail.contains("--out=f.gz.tbi") && detail.contains("--split=16")));
            assert!(matches!(events.last(), Some(FetchEvent::FetchSucceeded { .. })));
        }

        #[test]
        fn nonzero_exit_carries_stderr() {
            let bin = tempfile::tempdir().unwrap();
            let dest = tempfile::tempdir().unwrap();
            let t = Aria2Transport::with_program(script(
                bin.path(),
                "aria2c",
                "echo 'errorCode=3 Resource not found' >&2\nexit 3",
            ))
            .unwrap();

            let req = DownloadRequest::new("https://host/f.gz", dest.path());
            match t.transfer(&req, &CancelToken::new()).unwrap_err() {
                FetchError::TransferError { url, diagnostic } => {
                    assert_eq!(url, "https://host/f.gz");
                    assert!(diagnostic.contains("Resource not found"), "{}", diagnostic);
                }
                other => panic!("expected TransferError, got {:?}", other),
            }
        }

        #[test]
        fn cancel_kills_running_process() {
            let bin = tempfile::tempdir().unwrap();
            let dest = tempfile::tempdir().unwrap();
            let t = Aria2Transport::with_program(script(bin.path(), "aria2c", "exec sleep 30"))
                .unwrap();
            let cancel = CancelToken::new();
            let trigger = cancel.clone();
            let canceller = thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                trigger.cancel();
            });

            let started = std::time::Instant::now();
            let req = DownloadRequest::new("https://host/f.gz", dest.path());
            let err = t.transfer(&req, &cancel).unwrap_err();
            canceller.join().unwrap();
            assert!(matches!(err, FetchError::Cancelled { .. }));
            assert!(started.elapsed() < Duration::from_secs(10));
        }
    }
}
