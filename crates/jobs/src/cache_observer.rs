use ipscope_application::services::ResolutionEngine;
use ipscope_domain::config::CacheConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically evicts expired records from the resolution cache.
///
/// Stops when its cancellation token fires; by default that is the engine's
/// shutdown token.
pub struct CacheObserverJob {
    engine: Arc<ResolutionEngine>,
    initial_delay: Duration,
    interval: Duration,
    shutdown: CancellationToken,
}

impl CacheObserverJob {
    pub fn new(engine: Arc<ResolutionEngine>) -> Self {
        let shutdown = engine.shutdown_token();
        Self {
            engine,
            initial_delay: Duration::from_secs(10 * 60),
            interval: Duration::from_secs(20 * 60),
            shutdown,
        }
    }

    pub fn from_config(engine: Arc<ResolutionEngine>, config: &CacheConfig) -> Self {
        Self::new(engine).with_schedule(
            Duration::from_secs(config.observer_initial_delay_secs),
            Duration::from_secs(config.observer_interval_secs),
        )
    }

    pub fn with_schedule(mut self, initial_delay: Duration, interval: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.interval = interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// One sweep. Returns the number of records evicted.
    pub fn run_once(&self) -> usize {
        let removed = self.engine.sweep_cache(std::time::Instant::now());
        if removed > 0 {
            info!(
                removed,
                cache_size = self.engine.cache().len(),
                "Expired resolution records evicted"
            );
        } else {
            debug!(cache_size = self.engine.cache().len(), "Cache sweep found nothing to evict");
        }
        removed
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            initial_delay_secs = self.initial_delay.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Starting cache observer job"
        );

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(Instant::now() + self.initial_delay, self.interval);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("CacheObserverJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.run_once();
                    }
                }
            }
        });
    }
}
