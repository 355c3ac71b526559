use arc_swap::ArcSwap;
use ipscope_domain::config::ResolverConfig;
use ipscope_domain::DomainError;
use rustc_hash::FxHashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const DNS_PORT: u16 = 53;

/// Parses `ip`, `ip:port` or `[v6]:port`; the port defaults to 53.
pub fn parse_server_addr(server: &str) -> Result<SocketAddr, DomainError> {
    let server = server.trim();
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    server
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| DomainError::InvalidIpAddress(format!("Invalid DNS server '{}'", server)))
}

fn parse_servers(servers: &[String]) -> Result<Vec<SocketAddr>, DomainError> {
    servers.iter().map(|s| parse_server_addr(s)).collect()
}

fn dedup(servers: impl IntoIterator<Item = SocketAddr>) -> Vec<SocketAddr> {
    let mut seen = FxHashSet::default();
    servers.into_iter().filter(|s| seen.insert(*s)).collect()
}

/// The upstream servers queries go to, swappable as a whole.
///
/// Switching to the fallback set happens at most once per pool and is
/// visible to every lookup in flight from its next attempt on.
pub struct UpstreamPool {
    active: ArcSwap<Vec<SocketAddr>>,
    fallback: Vec<SocketAddr>,
    using_fallback: AtomicBool,
    round_robin: bool,
    cursor: AtomicUsize,
}

impl UpstreamPool {
    pub fn new(servers: Vec<SocketAddr>, fallback: Vec<SocketAddr>, round_robin: bool) -> Self {
        let servers = dedup(servers);
        let (active, using_fallback) = if servers.is_empty() {
            warn!("No upstream servers configured, using fallback resolvers");
            (fallback.clone(), true)
        } else {
            (servers, false)
        };

        Self {
            active: ArcSwap::from_pointee(active),
            fallback,
            using_fallback: AtomicBool::new(using_fallback),
            round_robin,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Configured servers win over `system_servers`, which are only used
    /// when the configuration lists none.
    pub fn from_config(
        config: &ResolverConfig,
        system_servers: Vec<SocketAddr>,
    ) -> Result<Self, DomainError> {
        let configured = parse_servers(&config.upstream_servers)?;
        let fallback = parse_servers(&config.fallback_servers)?;

        let mut servers = if configured.is_empty() {
            system_servers
        } else {
            configured
        };
        if config.add_fallback_to_rotation {
            servers.extend(fallback.iter().copied());
        }

        info!(
            servers = servers.len(),
            fallback = fallback.len(),
            round_robin = config.round_robin,
            "Upstream pool configured"
        );

        Ok(Self::new(servers, fallback, config.round_robin))
    }

    pub fn servers(&self) -> Arc<Vec<SocketAddr>> {
        self.active.load_full()
    }

    /// Servers in the order one query tries them. With round-robin the start
    /// position advances per call.
    pub fn ordered(&self) -> Vec<SocketAddr> {
        let servers = self.active.load();
        if !self.round_robin || servers.len() < 2 {
            return servers.as_ref().clone();
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % servers.len();
        servers[start..]
            .iter()
            .chain(servers[..start].iter())
            .copied()
            .collect()
    }

    pub fn switch_to_fallback(&self) -> bool {
        if self.using_fallback.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.active.store(Arc::new(self.fallback.clone()));
        info!(servers = ?self.fallback, "Switched to fallback resolvers");
        true
    }

    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::Acquire)
    }
}
