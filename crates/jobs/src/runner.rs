use crate::CacheObserverJob;
use std::sync::Arc;
use tracing::info;

/// Central orchestrator for all background jobs.
///
/// Use the builder pattern to register jobs, then call `.start()` once.
///
/// # Example
///
/// ```rust,ignore
/// JobRunner::new()
///     .with_cache_observer(CacheObserverJob::new(engine))
///     .start()
///     .await;
/// ```
pub struct JobRunner {
    cache_observer: Option<CacheObserverJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            cache_observer: None,
        }
    }

    pub fn with_cache_observer(mut self, job: CacheObserverJob) -> Self {
        self.cache_observer = Some(job);
        self
    }

    /// Start all registered background jobs.
    pub async fn start(self) {
        info!("Starting background job runner");

        if let Some(job) = self.cache_observer {
            Arc::new(job).start().await;
        }

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
