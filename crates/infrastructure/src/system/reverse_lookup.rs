use async_trait::async_trait;
use ipscope_application::ports::ReverseLookup;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tokio::time::timeout;
use tracing::debug;

/// Reverse lookup through the platform resolver (`getnameinfo`), which sees
/// hosts files and local name services the DNS stages do not.
pub struct SystemReverseLookup {
    timeout: Duration,
}

impl SystemReverseLookup {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ReverseLookup for SystemReverseLookup {
    async fn reverse(&self, ip: Ipv4Addr) -> Option<String> {
        let addr = IpAddr::V4(ip);
        match timeout(
            self.timeout,
            spawn_blocking(move || dns_lookup::lookup_addr(&addr).ok()),
        )
        .await
        {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                debug!(%ip, error = %e, "Reverse lookup task failed");
                None
            }
            Err(_) => {
                debug!(%ip, "Reverse lookup timed out");
                None
            }
        }
    }
}
