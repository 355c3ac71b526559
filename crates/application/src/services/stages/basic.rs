use crate::ports::{DnsClient, ResolverProfile};
use ipscope_domain::{BasicResult, DomainError, NormalizedQuery, QueryKind, QueryShape, RequestFailure, SubnetFacts};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Classifies a query and computes its address facts.
pub struct BasicStage {
    dns: Arc<dyn DnsClient>,
}

impl BasicStage {
    pub fn new(dns: Arc<dyn DnsClient>) -> Self {
        Self { dns }
    }

    #[instrument(skip(self), fields(query = %query))]
    pub async fn run(&self, query: &NormalizedQuery) -> BasicResult {
        match query.shape() {
            QueryShape::Domain => self.resolve_domain(query.as_str()).await,
            QueryShape::Address(address) => BasicResult::single_ip(address),
            QueryShape::Cidr {
                address: Some(address),
                prefix: Some(prefix),
            } => SubnetFacts::for_subnet(address, prefix)
                .map(BasicResult::subnet)
                .unwrap_or_else(BasicResult::invalid_subnet),
            QueryShape::Cidr { .. } => BasicResult::invalid_subnet(),
            QueryShape::MalformedAddress => BasicResult::unresolvable(QueryKind::SingleIp),
            QueryShape::Invalid => BasicResult::unresolvable(QueryKind::Invalid),
        }
    }

    async fn resolve_domain(&self, domain: &str) -> BasicResult {
        let answer = match self.dns.lookup_a(domain, ResolverProfile::Primary).await {
            Err(e) if e.is_timeout() => {
                debug!(domain, "A lookup timed out, rechecking");
                self.dns.lookup_a(domain, ResolverProfile::Recheck).await
            }
            other => other,
        };

        match answer {
            Ok(addresses) => match addresses.first() {
                Some(host) => BasicResult::domain(host.address),
                None => {
                    debug!(domain, "No A record");
                    BasicResult::unresolvable(QueryKind::Domain)
                }
            },
            Err(e) => {
                debug!(domain, error = %e, "A lookup failed");
                BasicResult::unresolvable(QueryKind::Domain).with_failure(failure_of(&e))
            }
        }
    }
}

pub(crate) fn failure_of(error: &DomainError) -> RequestFailure {
    if error.is_timeout() {
        RequestFailure::Timeout
    } else if error.is_no_nameserver() {
        RequestFailure::NoNameserver
    } else if error.is_transient() {
        RequestFailure::Io
    } else {
        RequestFailure::None
    }
}
