use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Reverse lookup through the operating system resolver.
#[async_trait]
pub trait ReverseLookup: Send + Sync {
    /// `None` when the platform has no name for `ip`.
    async fn reverse(&self, ip: Ipv4Addr) -> Option<String>;
}
