use crate::ports::{DnsClient, ResolverProfile, ReverseLookup};
use futures::stream::{self, StreamExt};
use ipscope_domain::query::trim_trailing_dots;
use ipscope_domain::{BasicResult, RdnsResult};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DEFAULT_RDNS_CONCURRENCY: usize = 16;

/// Reverse names for every usable address of a record.
pub struct RdnsStage {
    dns: Arc<dyn DnsClient>,
    reverse: Arc<dyn ReverseLookup>,
    concurrency: usize,
}

impl RdnsStage {
    pub fn new(dns: Arc<dyn DnsClient>, reverse: Arc<dyn ReverseLookup>, concurrency: usize) -> Self {
        Self {
            dns,
            reverse,
            concurrency: concurrency.max(1),
        }
    }

    /// Looks up every usable address of `basic` missing from `known`.
    #[instrument(skip_all, fields(usable = basic.usable_count()))]
    pub async fn run(&self, basic: &BasicResult, known: Option<RdnsResult>) -> RdnsResult {
        let mut result = known.unwrap_or_default();
        if !basic.resolvable || basic.usable_count() == 0 {
            return result;
        }

        let pending: Vec<Ipv4Addr> = basic
            .usable_addresses()
            .into_iter()
            .filter(|ip| !result.contains(*ip))
            .collect();

        let names: Vec<(Ipv4Addr, Option<String>)> = stream::iter(pending)
            .map(|ip| async move { (ip, self.lookup(ip).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (ip, name) in names {
            result.insert(ip, name);
        }

        debug!(
            resolved = result.resolved_count(),
            total = result.len(),
            "RDNS stage finished"
        );
        result
    }

    async fn lookup(&self, ip: Ipv4Addr) -> Option<String> {
        let literal = ip.to_string();
        match self.reverse.reverse(ip).await {
            Some(name) if trim_trailing_dots(&name) != literal && !name.is_empty() => {
                return Some(trim_trailing_dots(&name).to_string());
            }
            Some(_) => debug!(%ip, "OS reverse lookup echoed the address, querying PTR"),
            None => debug!(%ip, "OS reverse lookup empty, querying PTR"),
        }

        match self.dns.lookup_ptr(ip, ResolverProfile::Recheck).await {
            Ok(names) => names
                .last()
                .map(|name| trim_trailing_dots(name).to_string())
                .filter(|name| !name.is_empty()),
            Err(e) => {
                debug!(%ip, error = %e, "PTR lookup failed");
                None
            }
        }
    }
}
