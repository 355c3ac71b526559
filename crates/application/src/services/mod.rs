pub mod cache;
pub mod coordinator;
pub mod engine;
pub mod record;
pub mod stages;
pub mod worker_pool;

pub use cache::ResolutionCache;
pub use coordinator::{StageCoordinator, StageSet};
pub use engine::{EngineSettings, ResolutionEngine};
pub use record::{
    EvictionPolicy, ResolutionRecord, ResolutionReport, Stage, StageGuard, StagePhase,
    StageProgress,
};
pub use worker_pool::{plan_max_pool_size, AdaptiveWorkerPool, PoolSettings, PoolStats, PoolTask};
