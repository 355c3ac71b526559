#![allow(dead_code)]

use async_trait::async_trait;
use ipscope_application::ports::{
    DnsClient, HostAddress, MxAnswer, ProbeOutcome, ReachabilityProbe, ResolverProfile,
    ReverseLookup,
};
use ipscope_application::services::{EngineSettings, EvictionPolicy, ResolutionEngine, StageSet};
use ipscope_domain::{DomainError, PitfallList};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// Every name is unknown; IP queries never reach it.
pub struct NullDnsClient;

#[async_trait]
impl DnsClient for NullDnsClient {
    async fn lookup_a(&self, name: &str, _: ResolverProfile) -> Result<Vec<HostAddress>, DomainError> {
        Err(DomainError::NxDomain(name.to_string()))
    }

    async fn lookup_mx(&self, name: &str, _: ResolverProfile) -> Result<MxAnswer, DomainError> {
        Err(DomainError::NxDomain(name.to_string()))
    }

    async fn lookup_txt(&self, _: &str, _: ResolverProfile) -> Result<Vec<String>, DomainError> {
        Ok(Vec::new())
    }

    async fn lookup_ptr(&self, _: Ipv4Addr, _: ResolverProfile) -> Result<Vec<String>, DomainError> {
        Ok(Vec::new())
    }

    fn switch_to_fallback(&self) -> bool {
        false
    }

    fn is_using_fallback(&self) -> bool {
        false
    }
}

pub struct NullProbe;

#[async_trait]
impl ReachabilityProbe for NullProbe {
    async fn probe(&self, _: &str, _: u16) -> ProbeOutcome {
        ProbeOutcome::Failed
    }
}

pub struct NullReverse;

#[async_trait]
impl ReverseLookup for NullReverse {
    async fn reverse(&self, _: Ipv4Addr) -> Option<String> {
        None
    }
}

/// Engine whose records expire after `ttl` of inactivity.
pub fn engine_with_ttl(ttl: Duration) -> Arc<ResolutionEngine> {
    let stages = StageSet::new(
        Arc::new(NullDnsClient),
        Arc::new(NullProbe),
        Arc::new(NullReverse),
        PitfallList::default(),
        25,
        4,
    );
    let settings = EngineSettings {
        eviction: EvictionPolicy {
            ttl,
            unrequested_ttl: ttl,
        },
        ..EngineSettings::default()
    };
    Arc::new(ResolutionEngine::new(stages, settings))
}
