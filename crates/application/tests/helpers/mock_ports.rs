#![allow(dead_code)]

use async_trait::async_trait;
use ipscope_application::ports::{
    DnsClient, HostAddress, MxAnswer, MxExchange, ProbeOutcome, ReachabilityProbe,
    ResolverProfile, ReverseLookup,
};
use ipscope_domain::{DomainError, LookupType};
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

type Script<T> = Arc<RwLock<HashMap<String, VecDeque<Result<T, DomainError>>>>>;

/// Pops the next scripted answer; the last one repeats.
async fn next_answer<T: Clone>(script: &Script<T>, name: &str) -> Option<Result<T, DomainError>> {
    let mut map = script.write().await;
    let queue = map.get_mut(name)?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

async fn push<T>(script: &Script<T>, name: &str, answer: Result<T, DomainError>) {
    script
        .write()
        .await
        .entry(name.to_string())
        .or_default()
        .push_back(answer);
}

// ============================================================================
// Mock DnsClient
// ============================================================================

#[derive(Clone, Default)]
pub struct MockDnsClient {
    a: Script<Vec<HostAddress>>,
    mx: Script<MxAnswer>,
    txt: Script<Vec<String>>,
    ptr: Script<Vec<String>>,
    calls: Arc<RwLock<Vec<(LookupType, String, ResolverProfile)>>>,
    fallback: Arc<AtomicBool>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockDnsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_a(&self, name: &str, answer: Result<Vec<HostAddress>, DomainError>) {
        push(&self.a, name, answer).await;
    }

    pub async fn set_a(&self, name: &str, address: Ipv4Addr) {
        self.push_a(name, Ok(vec![host(name, address)])).await;
    }

    pub async fn push_mx(&self, name: &str, answer: Result<MxAnswer, DomainError>) {
        push(&self.mx, name, answer).await;
    }

    pub async fn push_txt(&self, name: &str, answer: Result<Vec<String>, DomainError>) {
        push(&self.txt, name, answer).await;
    }

    pub async fn push_ptr(&self, ip: Ipv4Addr, answer: Result<Vec<String>, DomainError>) {
        push(&self.ptr, &ip.to_string(), answer).await;
    }

    /// Every lookup sleeps this long before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn calls(&self) -> Vec<(LookupType, String, ResolverProfile)> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self, lookup: LookupType, name: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|(t, n, _)| *t == lookup && n == name)
            .count()
    }

    async fn record(&self, lookup: LookupType, name: &str, profile: ResolverProfile) {
        self.calls
            .write()
            .await
            .push((lookup, name.to_string(), profile));
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DnsClient for MockDnsClient {
    async fn lookup_a(
        &self,
        name: &str,
        profile: ResolverProfile,
    ) -> Result<Vec<HostAddress>, DomainError> {
        self.record(LookupType::A, name, profile).await;
        next_answer(&self.a, name)
            .await
            .unwrap_or_else(|| Err(DomainError::NxDomain(name.to_string())))
    }

    async fn lookup_mx(
        &self,
        name: &str,
        profile: ResolverProfile,
    ) -> Result<MxAnswer, DomainError> {
        self.record(LookupType::Mx, name, profile).await;
        next_answer(&self.mx, name)
            .await
            .unwrap_or_else(|| Err(DomainError::NxDomain(name.to_string())))
    }

    async fn lookup_txt(
        &self,
        name: &str,
        profile: ResolverProfile,
    ) -> Result<Vec<String>, DomainError> {
        self.record(LookupType::Txt, name, profile).await;
        next_answer(&self.txt, name).await.unwrap_or(Ok(Vec::new()))
    }

    async fn lookup_ptr(
        &self,
        ip: Ipv4Addr,
        profile: ResolverProfile,
    ) -> Result<Vec<String>, DomainError> {
        let name = ip.to_string();
        self.record(LookupType::Ptr, &name, profile).await;
        next_answer(&self.ptr, &name).await.unwrap_or(Ok(Vec::new()))
    }

    fn switch_to_fallback(&self) -> bool {
        !self.fallback.swap(true, Ordering::SeqCst)
    }

    fn is_using_fallback(&self) -> bool {
        self.fallback.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Mock ReachabilityProbe
// ============================================================================

#[derive(Clone)]
pub struct MockProbe {
    outcomes: Arc<RwLock<HashMap<String, ProbeOutcome>>>,
    default: ProbeOutcome,
    calls: Arc<RwLock<Vec<(String, u16)>>>,
}

impl MockProbe {
    pub fn new(default: ProbeOutcome) -> Self {
        Self {
            outcomes: Arc::new(RwLock::new(HashMap::new())),
            default,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn reachable() -> Self {
        Self::new(ProbeOutcome::Connected)
    }

    pub async fn set_outcome(&self, host: &str, outcome: ProbeOutcome) {
        self.outcomes.write().await.insert(host.to_string(), outcome);
    }

    pub async fn calls(&self) -> Vec<(String, u16)> {
        self.calls.read().await.clone()
    }

    pub async fn probe_count(&self, host: &str) -> usize {
        self.calls.read().await.iter().filter(|(h, _)| h == host).count()
    }
}

#[async_trait]
impl ReachabilityProbe for MockProbe {
    async fn probe(&self, host: &str, port: u16) -> ProbeOutcome {
        self.calls.write().await.push((host.to_string(), port));
        self.outcomes
            .read()
            .await
            .get(host)
            .copied()
            .unwrap_or(self.default)
    }
}

// ============================================================================
// Mock ReverseLookup
// ============================================================================

#[derive(Clone, Default)]
pub struct MockReverseLookup {
    names: Arc<RwLock<HashMap<Ipv4Addr, String>>>,
    echo: Arc<AtomicBool>,
}

impl MockReverseLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every unknown address with the address itself.
    pub fn echoing() -> Self {
        let lookup = Self::default();
        lookup.echo.store(true, Ordering::SeqCst);
        lookup
    }

    pub async fn set_name(&self, ip: Ipv4Addr, name: &str) {
        self.names.write().await.insert(ip, name.to_string());
    }
}

#[async_trait]
impl ReverseLookup for MockReverseLookup {
    async fn reverse(&self, ip: Ipv4Addr) -> Option<String> {
        if let Some(name) = self.names.read().await.get(&ip) {
            return Some(name.clone());
        }
        self.echo.load(Ordering::SeqCst).then(|| ip.to_string())
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn host(name: &str, address: Ipv4Addr) -> HostAddress {
    HostAddress {
        name: name.to_string(),
        address,
        ttl: 300,
    }
}

pub fn mx_answer(exchanges: &[(&str, u16)]) -> MxAnswer {
    MxAnswer {
        exchanges: exchanges
            .iter()
            .map(|(exchange, preference)| MxExchange {
                exchange: format!("{exchange}."),
                preference: *preference,
                ttl: 3600,
            })
            .collect(),
        additional: Vec::new(),
    }
}

pub fn with_additional(mut answer: MxAnswer, records: &[(&str, Ipv4Addr)]) -> MxAnswer {
    answer
        .additional
        .extend(records.iter().map(|(name, ip)| host(name, *ip)));
    answer
}
