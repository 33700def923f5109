//! Runs a job's files one after another through a `Transport`.

use std::sync::Arc;

use crate::cache::CacheLocation;
use crate::control::CancelToken;
use crate::error::FetchError;
use crate::observer::{FetchEvent, FetchObserver, TracingObserver};
use crate::transport::{DownloadResult, Transport};

use super::{DownloadJob, JobState};

pub struct Orchestrator<T> {
    transport: T,
    cache: CacheLocation,
    observer: Arc<dyn FetchObserver>,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(transport: T, cache: CacheLocation) -> Self {
        Self {
            transport,
            cache,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Downloads every entry in order into the cache directory and returns the
    /// completed files in job order. Stops at the first failure and returns
    /// that error as is; files already fetched are left in place.
    pub fn run(
        &self,
        job: &mut DownloadJob,
        cancel: &CancelToken,
    ) -> Result<Vec<DownloadResult>, FetchError> {
        job.set_state(JobState::Running);
        let result = self.run_entries(job, cancel);
        match &result {
            Ok(_) => {
                job.set_state(JobState::Succeeded);
                self.observer.on_event(&FetchEvent::JobSucceeded);
            }
            Err(e) => {
                job.set_state(JobState::Failed);
                self.observer.on_event(&FetchEvent::JobFailed {
                    error: e.to_string(),
                });
            }
        }
        result
    }

    fn run_entries(
        &self,
        job: &DownloadJob,
        cancel: &CancelToken,
    ) -> Result<Vec<DownloadResult>, FetchError> {
        let dir = self.cache.resolve()?;
        let requests = job.requests(&dir);
        self.observer.on_event(&FetchEvent::JobStarted {
            destination: dir,
            files: requests.len(),
        });

        let mut done = Vec::with_capacity(requests.len());
        for request in &requests {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled {
                    url: request.url.clone(),
                });
            }
            done.push(self.transport.transfer(request, cancel)?);
        }
        Ok(done)
    }
}
