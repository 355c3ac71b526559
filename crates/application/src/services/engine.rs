use super::cache::ResolutionCache;
use super::coordinator::{StageCoordinator, StageSet};
use super::record::{EvictionPolicy, ResolutionRecord, ResolutionReport};
use super::worker_pool::{AdaptiveWorkerPool, PoolSettings, PoolStats};
use futures::future::join_all;
use ipscope_domain::config::cache::MAX_CACHE_TTL_SECS;
use ipscope_domain::{Config, DomainError, NormalizedQuery, PitfallList, ResolutionOptions};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const MAIN_POOL_NAME: &str = "stages";
pub const RETRY_POOL_NAME: &str = "mx-retry";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub pool: PoolSettings,
    pub retry_pool: PoolSettings,
    pub auto_adjust: bool,
    pub eviction: EvictionPolicy,
    pub defaults: ResolutionOptions,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Result<Self, DomainError> {
        let pool = PoolSettings::new(
            config.pool.core_size,
            config.pool.max_size,
            config.pool.keep_alive(),
        )?;
        let retry_pool = PoolSettings::new(0, config.pool.retry_max_size, config.pool.keep_alive())?;

        Ok(Self {
            pool,
            retry_pool,
            auto_adjust: config.pool.auto_adjust,
            eviction: EvictionPolicy {
                ttl: config.cache.ttl(),
                unrequested_ttl: config.cache.unresolved_ttl(),
            },
            defaults: config.defaults.clone(),
        })
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pool: PoolSettings::default(),
            retry_pool: PoolSettings {
                max_size: 10,
                ..PoolSettings::default()
            },
            auto_adjust: true,
            eviction: EvictionPolicy::default(),
            defaults: ResolutionOptions::basic_only(),
        }
    }
}

/// Entry point of the library: owns the cache, the pools and the stages.
///
/// Queries are resolved in the background from [`ResolutionEngine::submit`]
/// on; [`ResolutionEngine::get`] waits for the requested stages of one query.
pub struct ResolutionEngine {
    cache: Arc<ResolutionCache>,
    coordinator: StageCoordinator,
    pool: AdaptiveWorkerPool,
    retry_pool: AdaptiveWorkerPool,
    defaults: Mutex<ResolutionOptions>,
    auto_adjust: AtomicBool,
    eviction: Mutex<EvictionPolicy>,
    shutdown: CancellationToken,
}

impl ResolutionEngine {
    pub fn new(stages: StageSet, settings: EngineSettings) -> Self {
        let pool = AdaptiveWorkerPool::new(MAIN_POOL_NAME, settings.pool);
        let retry_pool = AdaptiveWorkerPool::new(RETRY_POOL_NAME, settings.retry_pool);
        let coordinator = StageCoordinator::new(stages, pool.clone(), retry_pool.clone());

        info!(
            max_pool_size = settings.pool.max_size,
            retry_pool_size = settings.retry_pool.max_size,
            auto_adjust = settings.auto_adjust,
            "Resolution engine started"
        );

        Self {
            cache: Arc::new(ResolutionCache::new()),
            coordinator,
            pool,
            retry_pool,
            defaults: Mutex::new(settings.defaults),
            auto_adjust: AtomicBool::new(settings.auto_adjust),
            eviction: Mutex::new(settings.eviction),
            shutdown: CancellationToken::new(),
        }
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.shutdown.is_cancelled() {
            return Err(DomainError::EngineShutdown);
        }
        Ok(())
    }

    pub fn defaults(&self) -> ResolutionOptions {
        self.defaults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds `queries` to the cache and schedules their work with the current
    /// defaults. Inputs that normalize to nothing are skipped.
    ///
    /// Returns the number of queries accepted.
    #[instrument(skip_all)]
    pub fn submit<I, S>(&self, queries: I) -> Result<usize, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_open()?;
        let options = self.defaults();

        let mut accepted = 0;
        for raw in queries {
            let raw = raw.as_ref();
            match NormalizedQuery::parse(raw) {
                Ok(query) => {
                    self.admit(query, raw, &options);
                    accepted += 1;
                }
                Err(e) => debug!(raw, error = %e, "Query rejected"),
            }
        }

        debug!(accepted, cache_size = self.cache.len(), "Queries submitted");
        Ok(accepted)
    }

    fn admit(
        &self,
        query: NormalizedQuery,
        raw: &str,
        options: &ResolutionOptions,
    ) -> Arc<ResolutionRecord> {
        let (record, created) = self.cache.get_or_create(query, raw);
        let scheduled = self.coordinator.schedule(&record, options);
        if scheduled > 0 {
            debug!(query = %record.query(), created, scheduled, "Record scheduled");
        }
        record
    }

    /// Replaces the defaults and escalates every cached record to them.
    /// Stages already running or done are not repeated.
    ///
    /// Returns the number of stage tasks scheduled.
    #[instrument(skip(self))]
    pub fn configure(&self, options: ResolutionOptions) -> Result<usize, DomainError> {
        self.ensure_open()?;
        *self.defaults.lock().unwrap_or_else(PoisonError::into_inner) = options.clone();

        let pending: Vec<Arc<ResolutionRecord>> = self
            .cache
            .records()
            .into_iter()
            .filter(|record| record.needs(&options))
            .collect();

        if self.auto_adjust.load(AtomicOrdering::Acquire) {
            self.pool.auto_adjust(pending.len());
        }

        let scheduled: usize = pending
            .iter()
            .map(|record| self.coordinator.reconcile(record, &options))
            .sum();

        info!(records = pending.len(), scheduled, "Options escalated");
        Ok(scheduled)
    }

    /// Waits until every requested stage of `raw` is done and returns its
    /// report. Unknown queries are submitted first.
    pub async fn get(&self, raw: &str) -> Result<ResolutionReport, DomainError> {
        let query = NormalizedQuery::parse(raw)?;
        let record = match self.cache.get(&query) {
            Some(record) => record,
            None => {
                self.ensure_open()?;
                let options = self.defaults();
                self.admit(query, raw, &options)
            }
        };

        record.wait_until_settled().await;
        record.touch();
        Ok(record.report())
    }

    /// Requests the stages of `options` for `raw` alone, then waits like
    /// [`ResolutionEngine::get`]. Defaults and other records are unchanged.
    #[instrument(skip(self, options))]
    pub async fn get_with(
        &self,
        raw: &str,
        options: &ResolutionOptions,
    ) -> Result<ResolutionReport, DomainError> {
        let query = NormalizedQuery::parse(raw)?;
        let record = match self.cache.get(&query) {
            Some(record) => record,
            None => {
                self.ensure_open()?;
                let defaults = self.defaults();
                self.admit(query, raw, &defaults)
            }
        };

        if record.needs(options) {
            self.ensure_open()?;
            let scheduled = self.coordinator.reconcile(&record, options);
            debug!(query = %record.query(), scheduled, "Stages requested for one query");
        }

        record.wait_until_settled().await;
        record.touch();
        Ok(record.report())
    }

    /// Reports for every query that normalizes, in input order.
    pub async fn get_many<I, S>(&self, queries: I) -> Vec<ResolutionReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let queries: Vec<String> = queries
            .into_iter()
            .map(|q| q.as_ref().to_string())
            .collect();

        join_all(queries.iter().map(|q| self.get(q)))
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    }

    pub fn set_pitfalls(&self, pitfalls: PitfallList) {
        self.coordinator.stages().mx.set_pitfalls(pitfalls);
    }

    pub fn pitfalls(&self) -> Arc<PitfallList> {
        self.coordinator.stages().mx.pitfalls()
    }

    /// Disabling restores the configured pool maximum.
    pub fn set_auto_adjust(&self, enabled: bool) {
        self.auto_adjust.store(enabled, AtomicOrdering::Release);
        if !enabled {
            self.pool.restore_max_size();
        }
        debug!(enabled, "Pool auto-adjust toggled");
    }

    pub fn auto_adjust(&self) -> bool {
        self.auto_adjust.load(AtomicOrdering::Acquire)
    }

    pub fn set_cache_ttl(&self, ttl: Duration) -> Result<(), DomainError> {
        if ttl.is_zero() || ttl > Duration::from_secs(MAX_CACHE_TTL_SECS) {
            return Err(DomainError::InvalidSetting(format!(
                "cache TTL must be within 1..={MAX_CACHE_TTL_SECS} seconds"
            )));
        }
        self.eviction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ttl = ttl;
        Ok(())
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        *self.eviction.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Evicts records due at `now`. Returns the number removed.
    pub fn sweep_cache(&self, now: Instant) -> usize {
        self.cache.sweep(now, &self.eviction_policy())
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn retry_pool_stats(&self) -> PoolStats {
        self.retry_pool.stats()
    }

    /// Cancelled by [`ResolutionEngine::shutdown`]; background jobs stop on it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops intake, then drains both pools within `timeout`.
    ///
    /// Returns `false` when work had to be cancelled.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.shutdown.cancel();
        let started = Instant::now();

        let main_drained = self.pool.shutdown(timeout).await;
        let remaining = timeout.saturating_sub(started.elapsed());
        let retry_drained = self.retry_pool.shutdown(remaining).await;

        let drained = main_drained && retry_drained;
        if drained {
            info!(cache_size = self.cache.len(), "Resolution engine stopped");
        } else {
            warn!(
                main_drained,
                retry_drained, "Resolution engine stopped with cancelled work"
            );
        }
        drained
    }
}
