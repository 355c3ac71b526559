use ipscope_domain::{
    BasicResult, MxResult, NormalizedQuery, QueryKind, RdnsResult, ResolutionOptions, TxtResult,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Basic,
    Mx,
    Rdns,
    Txt,
}

impl Stage {
    /// Stages that start only after [`Stage::Basic`] is done.
    pub const DEPENDENT: [Stage; 3] = [Stage::Mx, Stage::Rdns, Stage::Txt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Basic => "basic",
            Stage::Mx => "mx",
            Stage::Rdns => "rdns",
            Stage::Txt => "txt",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePhase {
    #[default]
    NotRequested,
    Running,
    Done,
}

/// Phase of every stage of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageProgress {
    pub basic: StagePhase,
    pub mx: StagePhase,
    pub rdns: StagePhase,
    pub txt: StagePhase,
}

impl StageProgress {
    fn new() -> Self {
        Self {
            basic: StagePhase::Running,
            mx: StagePhase::NotRequested,
            rdns: StagePhase::NotRequested,
            txt: StagePhase::NotRequested,
        }
    }

    pub fn phase(&self, stage: Stage) -> StagePhase {
        match stage {
            Stage::Basic => self.basic,
            Stage::Mx => self.mx,
            Stage::Rdns => self.rdns,
            Stage::Txt => self.txt,
        }
    }

    fn set(&mut self, stage: Stage, phase: StagePhase) {
        match stage {
            Stage::Basic => self.basic = phase,
            Stage::Mx => self.mx = phase,
            Stage::Rdns => self.rdns = phase,
            Stage::Txt => self.txt = phase,
        }
    }

    pub fn is_running(&self) -> bool {
        self.basic == StagePhase::Running
            || Stage::DEPENDENT
                .iter()
                .any(|s| self.phase(*s) == StagePhase::Running)
    }

    /// Basic is done and no requested stage is still running.
    pub fn is_settled(&self) -> bool {
        self.basic == StagePhase::Done && !self.is_running()
    }
}

struct RecordState {
    options: ResolutionOptions,
    basic: BasicResult,
    basic_claimed: bool,
    mx: Option<MxResult>,
    rdns: Option<RdnsResult>,
    txt: Option<TxtResult>,
    retry_requested: bool,
    any_stage_requested: bool,
    last_accessed: Instant,
}

/// Cached state of one normalized query.
///
/// Results live behind a mutex, stage phases in a `watch` channel so that
/// waiters are woken on every transition. Claiming writes the channel while
/// holding the mutex; finishing writes it alone, after the stage stored its
/// result.
pub struct ResolutionRecord {
    query: NormalizedQuery,
    original: String,
    created_at: Instant,
    state: Mutex<RecordState>,
    progress: watch::Sender<StageProgress>,
}

impl ResolutionRecord {
    pub fn new(query: NormalizedQuery, original: &str) -> Self {
        let (progress, _) = watch::channel(StageProgress::new());
        Self {
            query,
            original: original.to_string(),
            created_at: Instant::now(),
            state: Mutex::new(RecordState {
                options: ResolutionOptions::basic_only(),
                basic: BasicResult::pending(),
                basic_claimed: false,
                mx: None,
                rdns: None,
                txt: None,
                retry_requested: false,
                any_stage_requested: false,
                last_accessed: Instant::now(),
            }),
            progress,
        }
    }

    fn state(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn query(&self) -> &NormalizedQuery {
        &self.query
    }

    /// Raw input of the first submission.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn kind(&self) -> QueryKind {
        self.state().basic.kind
    }

    pub fn basic(&self) -> BasicResult {
        self.state().basic.clone()
    }

    pub fn options(&self) -> ResolutionOptions {
        self.state().options.clone()
    }

    pub fn mx(&self) -> Option<MxResult> {
        self.state().mx.clone()
    }

    pub fn rdns(&self) -> Option<RdnsResult> {
        self.state().rdns.clone()
    }

    pub fn txt(&self) -> Option<TxtResult> {
        self.state().txt.clone()
    }

    pub fn progress(&self) -> StageProgress {
        *self.progress.borrow()
    }

    pub fn phase(&self, stage: Stage) -> StagePhase {
        self.progress.borrow().phase(stage)
    }

    pub fn is_settled(&self) -> bool {
        self.progress.borrow().is_settled()
    }

    pub fn any_stage_requested(&self) -> bool {
        self.state().any_stage_requested
    }

    pub fn touch(&self) {
        self.state().last_accessed = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.state().last_accessed)
    }

    /// Whether `requested` would start any stage on this record.
    pub fn needs(&self, requested: &ResolutionOptions) -> bool {
        let state = self.state();
        let progress = *self.progress.borrow();
        Stage::DEPENDENT
            .iter()
            .any(|stage| Self::wants(&state, &progress, *stage, requested))
    }

    fn wants(
        state: &RecordState,
        progress: &StageProgress,
        stage: Stage,
        requested: &ResolutionOptions,
    ) -> bool {
        let phase = progress.phase(stage);
        match stage {
            Stage::Basic => !state.basic_claimed,
            Stage::Mx => {
                if !requested.resolve_mx || phase == StagePhase::Running {
                    return false;
                }
                !(state.options.resolve_mx
                    && phase == StagePhase::Done
                    && state.options.mx_options == requested.mx_options)
            }
            Stage::Rdns => requested.resolve_rdns && phase == StagePhase::NotRequested,
            Stage::Txt => requested.resolve_txt && phase == StagePhase::NotRequested,
        }
    }

    /// Moves `stage` to Running if `requested` asks for work not yet running
    /// or done. The returned guard marks the stage Done when dropped.
    pub fn claim(
        self: &Arc<Self>,
        stage: Stage,
        requested: &ResolutionOptions,
    ) -> Option<StageGuard> {
        let mut state = self.state();
        let progress = *self.progress.borrow();
        if !Self::wants(&state, &progress, stage, requested) {
            return None;
        }

        match stage {
            Stage::Basic => state.basic_claimed = true,
            Stage::Mx => {
                state.options.resolve_mx = true;
                state.options.mx_options = requested.mx_options.clone();
                state.mx = None;
                state.retry_requested = false;
            }
            Stage::Rdns => state.options.resolve_rdns = true,
            Stage::Txt => state.options.resolve_txt = true,
        }
        if stage != Stage::Basic {
            state.any_stage_requested = true;
        }
        self.progress
            .send_modify(|p| p.set(stage, StagePhase::Running));
        drop(state);

        debug!(query = %self.query, stage = stage.as_str(), "Stage claimed");
        Some(StageGuard {
            record: Arc::clone(self),
            stage,
        })
    }

    pub fn store_basic(&self, basic: BasicResult) {
        self.state().basic = basic;
    }

    pub fn store_mx(&self, mx: MxResult) {
        self.state().mx = Some(mx);
    }

    pub fn store_rdns(&self, rdns: RdnsResult) {
        self.state().rdns = Some(rdns);
    }

    pub fn store_txt(&self, txt: TxtResult) {
        self.state().txt = Some(txt);
    }

    pub fn request_retry(&self) {
        self.state().retry_requested = true;
    }

    pub fn retry_requested(&self) -> bool {
        self.state().retry_requested
    }

    /// Clears the pending retry flag, returning whether it was set.
    pub fn take_retry_request(&self) -> bool {
        std::mem::take(&mut self.state().retry_requested)
    }

    fn finish(&self, stage: Stage) {
        self.progress.send_modify(|p| p.set(stage, StagePhase::Done));
        debug!(query = %self.query, stage = stage.as_str(), "Stage done");
    }

    /// Returns once `stage` is not running. Immediate for stages never requested.
    pub async fn wait_for_stage(&self, stage: Stage) {
        let mut rx = self.progress.subscribe();
        let _ = rx.wait_for(|p| p.phase(stage) != StagePhase::Running).await;
    }

    /// Returns once basic is done and no other stage is running.
    pub async fn wait_until_settled(&self) {
        let mut rx = self.progress.subscribe();
        let _ = rx.wait_for(StageProgress::is_settled).await;
    }

    /// Due for eviction: untouched for an hour without any stage requested,
    /// or untouched for `policy.ttl`. Never while a stage is running.
    pub fn is_expired(&self, now: Instant, policy: &EvictionPolicy) -> bool {
        let state = self.state();
        if self.progress.borrow().is_running() {
            return false;
        }
        let idle = now.saturating_duration_since(state.last_accessed);
        if state.any_stage_requested {
            idle > policy.ttl
        } else {
            idle > policy.unrequested_ttl
        }
    }

    pub fn report(&self) -> ResolutionReport {
        let state = self.state();
        let progress = *self.progress.borrow();
        ResolutionReport {
            query: self.query.clone(),
            original: self.original.clone(),
            kind: state.basic.kind,
            basic: state.basic.clone(),
            options: state.options.clone(),
            progress,
            mx: state.mx.clone(),
            rdns: state.rdns.clone(),
            txt: state.txt.clone(),
        }
    }
}

impl std::fmt::Debug for ResolutionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionRecord")
            .field("query", &self.query)
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

/// Marks its stage Done on drop, whichever way the stage task ends.
pub struct StageGuard {
    record: Arc<ResolutionRecord>,
    stage: Stage,
}

impl StageGuard {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn record(&self) -> &Arc<ResolutionRecord> {
        &self.record
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        self.record.finish(self.stage);
    }
}

/// Idle limits applied by the cache observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// For records that had at least one stage requested.
    pub ttl: Duration,
    /// For records that never had a stage besides basic requested.
    pub unrequested_ttl: Duration,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            unrequested_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Owned snapshot of a record.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub query: NormalizedQuery,
    pub original: String,
    pub kind: QueryKind,
    pub basic: BasicResult,
    pub options: ResolutionOptions,
    pub progress: StageProgress,
    pub mx: Option<MxResult>,
    pub rdns: Option<RdnsResult>,
    pub txt: Option<TxtResult>,
}

impl ResolutionReport {
    pub fn is_resolvable(&self) -> bool {
        self.basic.resolvable
    }

    pub fn is_settled(&self) -> bool {
        self.progress.is_settled()
    }
}
