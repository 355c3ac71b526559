use crate::ports::{DnsClient, ResolverProfile};
use ipscope_domain::query::reverse_lookup_name;
use ipscope_domain::{BasicResult, NormalizedQuery, QueryKind, TxtResult};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct TxtStage {
    dns: Arc<dyn DnsClient>,
}

impl TxtStage {
    pub fn new(dns: Arc<dyn DnsClient>) -> Self {
        Self { dns }
    }

    #[instrument(skip(self, basic), fields(query = %query))]
    pub async fn run(&self, query: &NormalizedQuery, basic: &BasicResult) -> TxtResult {
        if !basic.resolvable || basic.is_subnet() {
            return TxtResult::default();
        }

        let name = match (basic.kind, basic.facts) {
            (QueryKind::SingleIp, Some(facts)) => reverse_lookup_name(facts.address),
            _ => query.as_str().to_string(),
        };

        match self.dns.lookup_txt(&name, ResolverProfile::Primary).await {
            Ok(records) => {
                debug!(name = %name, count = records.len(), "TXT stage finished");
                TxtResult::new(records)
            }
            Err(e) => {
                warn!(name = %name, error = %e, "TXT lookup failed");
                TxtResult::default()
            }
        }
    }
}
