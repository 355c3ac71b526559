use super::record::{ResolutionRecord, Stage, StageGuard};
use super::stages::{BasicStage, MxStage, RdnsStage, TxtStage};
use super::worker_pool::AdaptiveWorkerPool;
use crate::ports::{DnsClient, ReachabilityProbe, ReverseLookup};
use ipscope_domain::{MxOption, PitfallList, ResolutionOptions};
use std::sync::Arc;
use tracing::{debug, warn};

/// The stage implementations, shared by every scheduled task.
pub struct StageSet {
    pub basic: BasicStage,
    pub mx: MxStage,
    pub rdns: RdnsStage,
    pub txt: TxtStage,
}

impl StageSet {
    pub fn new(
        dns: Arc<dyn DnsClient>,
        probe: Arc<dyn ReachabilityProbe>,
        reverse: Arc<dyn ReverseLookup>,
        pitfalls: PitfallList,
        smtp_port: u16,
        rdns_concurrency: usize,
    ) -> Self {
        Self {
            basic: BasicStage::new(Arc::clone(&dns)),
            mx: MxStage::new(Arc::clone(&dns), probe, pitfalls, smtp_port),
            rdns: RdnsStage::new(Arc::clone(&dns), reverse, rdns_concurrency),
            txt: TxtStage::new(dns),
        }
    }
}

/// Turns claimed stages into pool tasks.
///
/// Every task owns the [`StageGuard`] of its stage, so the stage reaches Done
/// when the task returns, panics or is dropped by a stopping pool.
pub struct StageCoordinator {
    stages: Arc<StageSet>,
    pool: AdaptiveWorkerPool,
    retry_pool: AdaptiveWorkerPool,
}

impl StageCoordinator {
    pub fn new(stages: StageSet, pool: AdaptiveWorkerPool, retry_pool: AdaptiveWorkerPool) -> Self {
        Self {
            stages: Arc::new(stages),
            pool,
            retry_pool,
        }
    }

    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    /// Starts basic if it never ran, then every stage `options` adds.
    /// Returns the number of tasks scheduled.
    pub fn schedule(&self, record: &Arc<ResolutionRecord>, options: &ResolutionOptions) -> usize {
        let mut scheduled = 0;
        if let Some(guard) = record.claim(Stage::Basic, options) {
            self.spawn_basic(guard);
            scheduled += 1;
        }
        scheduled + self.reconcile(record, options)
    }

    /// Schedules the dependent stages `options` requests and the record has
    /// not run yet. Running stages are left alone.
    pub fn reconcile(&self, record: &Arc<ResolutionRecord>, options: &ResolutionOptions) -> usize {
        let mut scheduled = 0;
        for stage in Stage::DEPENDENT {
            if let Some(guard) = record.claim(stage, options) {
                self.spawn_dependent(guard);
                scheduled += 1;
            }
        }
        scheduled
    }

    fn spawn_basic(&self, guard: StageGuard) {
        let stages = Arc::clone(&self.stages);
        let query = guard.record().query().clone();
        let task = async move {
            let record = Arc::clone(guard.record());
            let basic = stages.basic.run(record.query()).await;
            record.store_basic(basic);
            drop(guard);
        };

        if let Err(e) = self.pool.spawn(task) {
            warn!(query = %query, error = %e, "Basic stage not scheduled");
        }
    }

    fn spawn_dependent(&self, guard: StageGuard) {
        let stages = Arc::clone(&self.stages);
        let retry_pool = self.retry_pool.clone();
        let query = guard.record().query().clone();
        let stage = guard.stage();

        let task = async move {
            let record = Arc::clone(guard.record());
            record.wait_for_stage(Stage::Basic).await;

            match guard.stage() {
                Stage::Mx => run_mx(stages, retry_pool, guard, false).await,
                Stage::Rdns => {
                    let rdns = stages.rdns.run(&record.basic(), record.rdns()).await;
                    record.store_rdns(rdns);
                }
                Stage::Txt => {
                    let txt = stages.txt.run(record.query(), &record.basic()).await;
                    record.store_txt(txt);
                }
                Stage::Basic => {}
            }
        };

        match self.pool.spawn(task) {
            Ok(()) => debug!(query = %query, stage = stage.as_str(), "Stage scheduled"),
            Err(e) => warn!(query = %query, stage = stage.as_str(), error = %e, "Stage not scheduled"),
        }
    }
}

async fn run_mx(
    stages: Arc<StageSet>,
    retry_pool: AdaptiveWorkerPool,
    guard: StageGuard,
    is_retry: bool,
) {
    let record = Arc::clone(guard.record());
    let options = record.options();
    let basic = record.basic();

    let outcome = stages
        .mx
        .run(record.query(), &basic, &options.mx_options, is_retry)
        .await;
    record.store_mx(outcome.result);

    if outcome.retry_requested && options.mx_options.contains(MxOption::Retry) {
        record.request_retry();
        spawn_mx_retry(stages, retry_pool, guard);
    }
}

/// Hands the still-running MX stage over to the retry pool.
fn spawn_mx_retry(stages: Arc<StageSet>, retry_pool: AdaptiveWorkerPool, guard: StageGuard) {
    let query = guard.record().query().clone();
    let pool = retry_pool.clone();
    let task = async move {
        guard.record().take_retry_request();
        run_mx(stages, pool, guard, true).await;
    };

    match retry_pool.spawn(task) {
        Ok(()) => debug!(query = %query, "MX retry scheduled"),
        Err(e) => warn!(query = %query, error = %e, "MX retry not scheduled"),
    }
}
