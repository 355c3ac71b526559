use async_trait::async_trait;
use ipscope_domain::DomainError;
use std::net::Ipv4Addr;

/// Which timeout/retry profile a lookup runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverProfile {
    /// Short timeout, no extra attempts.
    Primary,
    /// Long timeout with an extra attempt, used for retries and fallbacks.
    Recheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    pub name: String,
    pub address: Ipv4Addr,
    pub ttl: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxExchange {
    pub exchange: String,
    pub preference: u16,
    pub ttl: u32,
}

/// MX answer plus the A records the server put in the additional section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MxAnswer {
    pub exchanges: Vec<MxExchange>,
    pub additional: Vec<HostAddress>,
}

impl MxAnswer {
    /// Additional-section addresses published for `target`.
    pub fn additional_addresses(&self, target: &str) -> Vec<Ipv4Addr> {
        let target = target.trim_end_matches('.');
        self.additional
            .iter()
            .filter(|a| a.name.trim_end_matches('.').eq_ignore_ascii_case(target))
            .map(|a| a.address)
            .collect()
    }
}

/// DNS lookups the resolution stages depend on.
///
/// Implementations report a timeout as [`DomainError::QueryTimeout`] and an
/// upstream set that refused every attempt as
/// [`DomainError::NoNameserverReachable`]. A missing name is
/// [`DomainError::NxDomain`]; an existing name without data is `Ok` and empty.
#[async_trait]
pub trait DnsClient: Send + Sync {
    async fn lookup_a(
        &self,
        name: &str,
        profile: ResolverProfile,
    ) -> Result<Vec<HostAddress>, DomainError>;

    async fn lookup_mx(&self, name: &str, profile: ResolverProfile)
        -> Result<MxAnswer, DomainError>;

    async fn lookup_txt(
        &self,
        name: &str,
        profile: ResolverProfile,
    ) -> Result<Vec<String>, DomainError>;

    async fn lookup_ptr(
        &self,
        ip: Ipv4Addr,
        profile: ResolverProfile,
    ) -> Result<Vec<String>, DomainError>;

    /// Replaces the upstream set with the public fallback resolvers.
    /// Returns `true` only for the call that performed the switch.
    fn switch_to_fallback(&self) -> bool;

    fn is_using_fallback(&self) -> bool;
}
