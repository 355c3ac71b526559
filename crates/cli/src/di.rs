use ipscope_application::services::{EngineSettings, ResolutionEngine, StageSet};
use ipscope_domain::Config;
use ipscope_infrastructure::system::RESOLV_CONF_PATH;
use ipscope_infrastructure::{
    load_pitfalls, read_system_nameservers, HickoryDnsClient, SystemReverseLookup,
    TcpReachabilityProbe, UpstreamPool,
};
use ipscope_jobs::{CacheObserverJob, JobRunner};
use std::sync::Arc;
use tracing::info;

/// Wires the adapters into a [`ResolutionEngine`].
pub fn build_engine(config: &Config) -> anyhow::Result<Arc<ResolutionEngine>> {
    let system_servers = if config.resolver.upstream_servers.is_empty() {
        read_system_nameservers(RESOLV_CONF_PATH)
    } else {
        Vec::new()
    };
    let upstreams = Arc::new(UpstreamPool::from_config(&config.resolver, system_servers)?);
    let dns = Arc::new(HickoryDnsClient::from_config(&config.resolver, upstreams));
    let probe = Arc::new(TcpReachabilityProbe::from_config(&config.mx));
    let reverse = Arc::new(SystemReverseLookup::new(config.rdns.os_lookup_timeout()));

    let pitfalls = load_pitfalls(&config.mx)?;
    info!(pitfalls = pitfalls.len(), "Pitfall list ready");

    let stages = StageSet::new(
        dns,
        probe,
        reverse,
        pitfalls,
        config.mx.smtp_port,
        config.rdns.concurrency,
    );
    let settings = EngineSettings::from_config(config)?;

    Ok(Arc::new(ResolutionEngine::new(stages, settings)))
}

pub async fn start_jobs(engine: &Arc<ResolutionEngine>, config: &Config) {
    let mut runner = JobRunner::new();
    if config.cache.observer_enabled {
        runner = runner.with_cache_observer(CacheObserverJob::from_config(
            Arc::clone(engine),
            &config.cache,
        ));
    }
    runner.start().await;
}
