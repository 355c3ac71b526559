pub mod cache_observer;
pub mod runner;

pub use cache_observer::CacheObserverJob;
pub use runner::JobRunner;
