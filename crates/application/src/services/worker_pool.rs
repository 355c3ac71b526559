use futures::FutureExt;
use ipscope_domain::config::pool::{MAX_KEEP_ALIVE_SECS, MAX_POOL_SIZE_LIMIT};
use ipscope_domain::DomainError;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub type PoolTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// The heuristic never plans beyond this size.
pub const AUTO_ADJUST_CEILING: usize = 100;
const AUTO_ADJUST_SOFT_LIMIT: usize = 50;

/// Plans a new maximum pool size for `requests` pending stage runs.
///
/// Returns `None` when the pool is already large enough or at the ceiling.
pub fn plan_max_pool_size(current_max: usize, busy: usize, requests: usize) -> Option<usize> {
    if requests == 0
        || current_max >= AUTO_ADJUST_CEILING
        || current_max.saturating_sub(busy) >= requests
    {
        return None;
    }

    let deficit = requests.saturating_sub(current_max);
    let mut plan = if deficit > AUTO_ADJUST_SOFT_LIMIT && current_max < AUTO_ADJUST_SOFT_LIMIT {
        AUTO_ADJUST_SOFT_LIMIT
    } else {
        (current_max + deficit).min(AUTO_ADJUST_SOFT_LIMIT.max(current_max))
    };

    if plan < requests {
        plan = (plan + (current_max / 4).max(1)).min(requests);
    }

    let plan = plan.min(AUTO_ADJUST_CEILING);
    (plan > current_max).then_some(plan)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub core_size: usize,
    pub max_size: usize,
    pub keep_alive: Duration,
}

impl PoolSettings {
    pub fn new(core_size: usize, max_size: usize, keep_alive: Duration) -> Result<Self, DomainError> {
        if max_size == 0 || max_size > MAX_POOL_SIZE_LIMIT {
            return Err(DomainError::InvalidPoolParameters(format!(
                "max size must be within 1..={MAX_POOL_SIZE_LIMIT}, got {max_size}"
            )));
        }
        if core_size > max_size {
            return Err(DomainError::InvalidPoolParameters(format!(
                "core size {core_size} exceeds max size {max_size}"
            )));
        }
        if keep_alive > Duration::from_secs(MAX_KEEP_ALIVE_SECS) {
            return Err(DomainError::InvalidPoolParameters(
                "keep-alive cannot exceed 24 hours".into(),
            ));
        }
        Ok(Self {
            core_size,
            max_size,
            keep_alive,
        })
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            core_size: 0,
            max_size: 20,
            keep_alive: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub workers: usize,
    pub idle: usize,
    pub queued: usize,
    pub max_size: usize,
    pub core_size: usize,
    pub completed: u64,
    pub panicked: u64,
}

impl PoolStats {
    pub fn busy(&self) -> usize {
        self.workers.saturating_sub(self.idle)
    }
}

struct PoolInner {
    name: &'static str,
    sender: Mutex<Option<mpsc::UnboundedSender<PoolTask>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<PoolTask>>,
    workers: AtomicUsize,
    idle: AtomicUsize,
    queued: AtomicUsize,
    max_size: AtomicUsize,
    configured_max: usize,
    core_size: usize,
    keep_alive: Duration,
    completed: AtomicU64,
    panicked: AtomicU64,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// Bounded executor fed by an unbounded FIFO queue.
///
/// Workers are spawned on demand up to the current maximum and exit after
/// `keep_alive` without work while the pool has more than `core_size`.
/// A panicking task is logged and does not take its worker down.
#[derive(Clone)]
pub struct AdaptiveWorkerPool {
    inner: Arc<PoolInner>,
}

impl AdaptiveWorkerPool {
    pub fn new(name: &'static str, settings: PoolSettings) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(PoolInner {
                name,
                sender: Mutex::new(Some(sender)),
                receiver: tokio::sync::Mutex::new(receiver),
                workers: AtomicUsize::new(0),
                idle: AtomicUsize::new(0),
                queued: AtomicUsize::new(0),
                max_size: AtomicUsize::new(settings.max_size),
                configured_max: settings.max_size,
                core_size: settings.core_size,
                keep_alive: settings.keep_alive,
                completed: AtomicU64::new(0),
                panicked: AtomicU64::new(0),
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Queues `task`. Fails only after [`AdaptiveWorkerPool::shutdown`].
    pub fn submit(&self, task: PoolTask) -> Result<(), DomainError> {
        {
            let sender = self
                .inner
                .sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(sender) = sender.as_ref() else {
                return Err(DomainError::PoolShutdown(self.inner.name));
            };

            self.inner.queued.fetch_add(1, AtomicOrdering::AcqRel);
            if sender.send(task).is_err() {
                self.inner.queued.fetch_sub(1, AtomicOrdering::AcqRel);
                return Err(DomainError::PoolShutdown(self.inner.name));
            }
        }

        self.inner.ensure_workers();
        Ok(())
    }

    pub fn spawn<F>(&self, future: F) -> Result<(), DomainError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.submit(Box::pin(future))
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        PoolStats {
            workers: inner.workers.load(AtomicOrdering::Acquire),
            idle: inner.idle.load(AtomicOrdering::Acquire),
            queued: inner.queued.load(AtomicOrdering::Acquire),
            max_size: inner.max_size.load(AtomicOrdering::Acquire),
            core_size: inner.core_size,
            completed: inner.completed.load(AtomicOrdering::Relaxed),
            panicked: inner.panicked.load(AtomicOrdering::Relaxed),
        }
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size.load(AtomicOrdering::Acquire)
    }

    pub fn set_max_size(&self, max_size: usize) -> Result<(), DomainError> {
        if max_size == 0 || max_size > MAX_POOL_SIZE_LIMIT || max_size < self.inner.core_size {
            return Err(DomainError::InvalidPoolParameters(format!(
                "max size must be within {}..={MAX_POOL_SIZE_LIMIT}, got {max_size}",
                self.inner.core_size.max(1)
            )));
        }

        let previous = self.inner.max_size.swap(max_size, AtomicOrdering::AcqRel);
        if previous != max_size {
            debug!(pool = self.inner.name, from = previous, to = max_size, "Pool max size changed");
        }
        self.inner.ensure_workers();
        Ok(())
    }

    /// Grows the maximum for `requests` upcoming tasks when the plan says so.
    pub fn auto_adjust(&self, requests: usize) -> Option<usize> {
        let stats = self.stats();
        let plan = plan_max_pool_size(stats.max_size, stats.busy(), requests)?;

        self.inner.max_size.store(plan, AtomicOrdering::Release);
        info!(
            pool = self.inner.name,
            from = stats.max_size,
            to = plan,
            requests,
            "Worker pool grown"
        );
        self.inner.ensure_workers();
        Some(plan)
    }

    /// Returns to the maximum the pool was created with.
    pub fn restore_max_size(&self) {
        self.inner
            .max_size
            .store(self.inner.configured_max, AtomicOrdering::Release);
    }

    /// Closes intake and waits for queued and running tasks.
    ///
    /// After `timeout` running tasks are cancelled, queued tasks are dropped
    /// without being polled and `false` is returned.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let inner = &self.inner;
        inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        inner.tracker.close();

        if tokio::time::timeout(timeout, inner.tracker.wait())
            .await
            .is_ok()
        {
            info!(pool = inner.name, "Worker pool drained");
            return true;
        }

        warn!(
            pool = inner.name,
            queued = inner.queued.load(AtomicOrdering::Acquire),
            "Worker pool shutdown timed out, cancelling remaining tasks"
        );
        inner.cancel.cancel();
        inner.tracker.wait().await;
        let discarded = inner.discard_queued().await;
        if discarded > 0 {
            debug!(pool = inner.name, discarded, "Queued tasks dropped");
        }
        false
    }
}

impl PoolInner {
    fn ensure_workers(self: &Arc<Self>) {
        loop {
            let workers = self.workers.load(AtomicOrdering::Acquire);
            let idle = self.idle.load(AtomicOrdering::Acquire);
            let queued = self.queued.load(AtomicOrdering::Acquire);
            if workers >= self.max_size.load(AtomicOrdering::Acquire) || idle >= queued {
                return;
            }

            if self
                .workers
                .compare_exchange(workers, workers + 1, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
                .is_ok()
            {
                self.idle.fetch_add(1, AtomicOrdering::AcqRel);
                let inner = Arc::clone(self);
                self.tracker.spawn(run_worker(inner));
                debug!(pool = self.name, workers = workers + 1, "Worker started");
            }
        }
    }

    /// Removes one worker from the count if more than `limit` are running.
    fn try_retire(&self, limit: usize) -> bool {
        let mut current = self.workers.load(AtomicOrdering::Acquire);
        loop {
            if current <= limit {
                return false;
            }
            match self.workers.compare_exchange(
                current,
                current - 1,
                AtomicOrdering::AcqRel,
                AtomicOrdering::Acquire,
            ) {
                Ok(_) => {
                    self.idle.fetch_sub(1, AtomicOrdering::AcqRel);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Drops every task left in the queue. Must run after the workers stopped.
    async fn discard_queued(&self) -> usize {
        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut discarded = 0;
        while let Ok(task) = receiver.try_recv() {
            self.queued.fetch_sub(1, AtomicOrdering::AcqRel);
            drop(task);
            discarded += 1;
        }
        discarded
    }

    fn release(&self) {
        self.workers.fetch_sub(1, AtomicOrdering::AcqRel);
        self.idle.fetch_sub(1, AtomicOrdering::AcqRel);
    }
}

async fn run_worker(inner: Arc<PoolInner>) {
    loop {
        let next = {
            let wait = async { inner.receiver.lock().await.recv().await };
            let is_core = inner.workers.load(AtomicOrdering::Acquire) <= inner.core_size;
            tokio::select! {
                biased;
                _ = inner.cancel.cancelled() => {
                    inner.release();
                    return;
                }
                next = async {
                    if is_core {
                        Ok(wait.await)
                    } else {
                        tokio::time::timeout(inner.keep_alive, wait).await
                    }
                } => next,
            }
        };

        let task = match next {
            Ok(Some(task)) => task,
            Ok(None) => {
                inner.release();
                debug!(pool = inner.name, "Worker stopped, queue closed");
                return;
            }
            Err(_) => {
                if inner.try_retire(inner.core_size) {
                    debug!(pool = inner.name, "Idle worker retired");
                    // a submission may have raced the retirement
                    inner.ensure_workers();
                    return;
                }
                continue;
            }
        };

        inner.queued.fetch_sub(1, AtomicOrdering::AcqRel);
        inner.idle.fetch_sub(1, AtomicOrdering::AcqRel);

        let outcome = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => None,
            outcome = AssertUnwindSafe(task).catch_unwind() => Some(outcome),
        };

        inner.idle.fetch_add(1, AtomicOrdering::AcqRel);
        match outcome {
            None => {
                inner.release();
                return;
            }
            Some(Ok(())) => {
                inner.completed.fetch_add(1, AtomicOrdering::Relaxed);
            }
            Some(Err(_)) => {
                inner.panicked.fetch_add(1, AtomicOrdering::Relaxed);
                error!(pool = inner.name, "Pool task panicked");
            }
        }

        let max = inner.max_size.load(AtomicOrdering::Acquire);
        if inner.try_retire(max.max(inner.core_size)) {
            debug!(pool = inner.name, "Worker retired after shrink");
            return;
        }
    }
}
