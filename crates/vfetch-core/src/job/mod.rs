//! Download jobs: an ordered list of files that must all land in one
//! directory, and the orchestrator that drives them through a transport.

mod orchestrator;

pub use orchestrator::Orchestrator;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::transport::DownloadRequest;

/// Directory of the current dbSNP VCF release.
pub const DBSNP_BASE_URL: &str = "https://ftp.ncbi.nih.gov/snp/latest_release/VCF";
/// dbSNP archive for GRCh38 and its tabix index, in download order.
pub const DBSNP_FILES: [&str; 2] = ["GCF_000001405.40.gz", "GCF_000001405.40.gz.tbi"];

/// One file in a job. `filename` overrides the URL's basename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl JobEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }
}

/// Ordered files that succeed or fail together.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    entries: Vec<JobEntry>,
    state: JobState,
}

impl DownloadJob {
    pub fn new(entries: Vec<JobEntry>) -> Self {
        Self {
            entries,
            state: JobState::Pending,
        }
    }

    /// The reference job: dbSNP archive, then its index.
    pub fn dbsnp() -> Self {
        Self::new(
            DBSNP_FILES
                .iter()
                .map(|f| JobEntry::new(format!("{}/{}", DBSNP_BASE_URL, f)))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[JobEntry] {
        &self.entries
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: JobState) {
        tracing::debug!(state = state.as_str(), "job state");
        self.state = state;
    }

    /// Requests for every entry, in order, all into `dir`.
    pub fn requests(&self, dir: &Path) -> Vec<DownloadRequest> {
        self.entries
            .iter()
            .map(|e| DownloadRequest {
                url: e.url.clone(),
                destination_dir: dir.to_path_buf(),
                filename: e.filename.clone(),
            })
            .collect()
    }
}
