use super::basic::failure_of;
use crate::ports::{DnsClient, MxAnswer, MxExchange, ProbeOutcome, ReachabilityProbe, ResolverProfile};
use arc_swap::ArcSwap;
use ipscope_domain::query::{
    is_blackhole_name, is_domain_name, is_ip_literal, is_placeholder_ip,
    trim_trailing_dots,
};
use ipscope_domain::{
    BasicResult, DomainError, MxOption, MxOptions, MxRecordResult, MxResult, NormalizedQuery,
    PitfallList,
};
use rustc_hash::FxHashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// TTL given to the synthesized root entry.
pub const ROOT_FALLBACK_TTL: u32 = 24 * 60 * 60;

/// Host strings shorter than this are never probed.
const MIN_PROBE_HOST_LEN: usize = 4;

pub struct MxOutcome {
    pub result: MxResult,
    /// A transient failure hit a first run; one retry is warranted.
    pub retry_requested: bool,
}

/// Fetches MX targets and applies the verification heuristics.
pub struct MxStage {
    dns: Arc<dyn DnsClient>,
    probe: Arc<dyn ReachabilityProbe>,
    pitfalls: ArcSwap<PitfallList>,
    smtp_port: u16,
}

impl MxStage {
    pub fn new(
        dns: Arc<dyn DnsClient>,
        probe: Arc<dyn ReachabilityProbe>,
        pitfalls: PitfallList,
        smtp_port: u16,
    ) -> Self {
        Self {
            dns,
            probe,
            pitfalls: ArcSwap::from_pointee(pitfalls),
            smtp_port,
        }
    }

    pub fn set_pitfalls(&self, pitfalls: PitfallList) {
        info!(count = pitfalls.len(), "Pitfall list replaced");
        self.pitfalls.store(Arc::new(pitfalls));
    }

    pub fn pitfalls(&self) -> Arc<PitfallList> {
        self.pitfalls.load_full()
    }

    #[instrument(skip(self, basic, options), fields(query = %query))]
    pub async fn run(
        &self,
        query: &NormalizedQuery,
        basic: &BasicResult,
        options: &MxOptions,
        is_retry: bool,
    ) -> MxOutcome {
        let fresh = || {
            if is_retry {
                MxResult::for_retry()
            } else {
                MxResult::new()
            }
        };
        let mut result = fresh();
        let mut retry_requested = false;

        if !basic.resolvable || basic.is_subnet() {
            debug!("MX skipped for unresolvable or subnet query");
            return MxOutcome {
                result,
                retry_requested,
            };
        }

        let profile = if is_retry {
            ResolverProfile::Recheck
        } else {
            ResolverProfile::Primary
        };
        let mut switched = false;

        loop {
            let mut session = VerificationSession::new(self.probe.as_ref(), options);
            match self
                .collect(query, options, profile, &mut session, &mut result)
                .await
            {
                Ok(()) => break,
                Err(e) if e.is_no_nameserver() && !switched && self.dns.switch_to_fallback() => {
                    info!(error = %e, "No nameserver reachable, switched to fallback resolvers");
                    switched = true;
                    result = fresh();
                }
                Err(e) if e.is_transient() || e.is_no_nameserver() => {
                    debug!(error = %e, is_retry, "MX lookup failed");
                    result.request_failure = failure_of(&e);
                    retry_requested = !is_retry;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "MX lookup failed");
                    break;
                }
            }
        }

        result.used_fallback_resolvers = switched || self.dns.is_using_fallback();
        debug!(
            entries = result.len(),
            failure = ?result.request_failure,
            retry_requested,
            "MX stage finished"
        );
        MxOutcome {
            result,
            retry_requested,
        }
    }

    async fn collect(
        &self,
        query: &NormalizedQuery,
        options: &MxOptions,
        profile: ResolverProfile,
        session: &mut VerificationSession<'_>,
        result: &mut MxResult,
    ) -> Result<(), DomainError> {
        let answer = match self.dns.lookup_mx(query.as_str(), profile).await {
            Ok(answer) => answer,
            Err(DomainError::NxDomain(name)) => {
                debug!(name = %name, "MX lookup returned NXDOMAIN");
                MxAnswer::default()
            }
            Err(e) => return Err(e),
        };

        let pitfalls = self.pitfalls.load_full();
        let mut exchanges: Vec<&MxExchange> = answer.exchanges.iter().collect();
        exchanges.sort_by_key(|e| e.preference);

        for exchange in exchanges {
            let target = trim_trailing_dots(&exchange.exchange).to_lowercase();
            if !(is_domain_name(&target) || is_ip_literal(&target)) || is_placeholder_ip(&target) {
                debug!(target = %target, "Invalid MX target discarded");
                continue;
            }

            let mut entry = MxRecordResult::new(&target, exchange.preference, exchange.ttl);
            entry.smtp_port = self.smtp_port;

            if pitfalls.contains(&target) {
                if options.contains(MxOption::SkipPitfalls) {
                    continue;
                }
                entry.mark_pitfall();
            }

            if entry.disabled && !entry.pitfall && options.contains(MxOption::SkipDisabled) {
                continue;
            }

            if is_blackhole_name(&target) {
                if options.contains(MxOption::SkipBlackholes) {
                    continue;
                }
                entry.blackhole_suspect = true;
            }

            if options.verifies_domain()
                && !entry.blackhole_suspect
                && !entry.pitfall
                && !entry.disabled
            {
                let reachable = session.verify(&target, entry.smtp_port).await;
                entry.set_reachable(reachable);
                if !reachable && options.contains(MxOption::SkipUnreachable) {
                    continue;
                }
            }

            if options.resolves_ips() && !entry.pitfall && !entry.disabled {
                let addresses = match self.addresses_of(&target, &answer, profile).await {
                    Some(addresses) => addresses,
                    None => continue,
                };

                for ip in addresses {
                    if entry.blackhole_suspect {
                        entry.add_ip(ip, Some(false));
                    } else if options.verifies_ips() {
                        let reachable = session.verify(&ip.to_string(), entry.smtp_port).await;
                        if !reachable && options.contains(MxOption::SkipUnreachable) {
                            continue;
                        }
                        entry.add_ip(ip, Some(reachable));
                    } else {
                        entry.add_ip(ip, None);
                    }
                }
            }

            entry.finish();
            let outcome = result.add(entry, options);
            debug!(target = %target, priority = exchange.preference, ?outcome, "MX entry processed");
        }

        if options.contains(MxOption::CheckRoot) && result.is_empty() {
            let root = query.as_str();
            let mut entry = MxRecordResult::new(root, 0, ROOT_FALLBACK_TTL);
            if session.verify(root, entry.smtp_port).await {
                entry.set_reachable(true);
                entry.finish();
                result.add(entry, options);
                debug!(root, "Root fallback entry added");
            }
        }

        Ok(())
    }

    /// Addresses of an MX target, from the additional section or a follow-up
    /// A query. `None` when the follow-up timed out.
    async fn addresses_of(
        &self,
        target: &str,
        answer: &MxAnswer,
        profile: ResolverProfile,
    ) -> Option<Vec<Ipv4Addr>> {
        if let Ok(ip) = Ipv4Addr::from_str(target) {
            return Some(vec![ip]);
        }

        let additional = answer.additional_addresses(target);
        if !additional.is_empty() {
            return Some(additional);
        }

        match self.dns.lookup_a(target, profile).await {
            Ok(hosts) => Some(hosts.into_iter().map(|h| h.address).collect()),
            Err(e) if e.is_timeout() => {
                debug!(target, "A lookup for MX target timed out, entry skipped");
                None
            }
            Err(e) => {
                debug!(target, error = %e, "A lookup for MX target failed");
                Some(Vec::new())
            }
        }
    }
}

/// Probe outcomes shared by every target of one stage invocation.
struct VerificationSession<'a> {
    probe: &'a dyn ReachabilityProbe,
    skip_refused: bool,
    verified: FxHashMap<String, bool>,
}

impl<'a> VerificationSession<'a> {
    fn new(probe: &'a dyn ReachabilityProbe, options: &MxOptions) -> Self {
        Self {
            probe,
            skip_refused: options.contains(MxOption::SkipRefused),
            verified: FxHashMap::default(),
        }
    }

    async fn verify(&mut self, host: &str, port: u16) -> bool {
        if let Some(known) = self.verified.get(host) {
            return *known;
        }

        let reachable = if host.len() < MIN_PROBE_HOST_LEN {
            false
        } else {
            match self.probe.probe(host, port).await {
                ProbeOutcome::Connected => true,
                ProbeOutcome::Refused => !self.skip_refused,
                ProbeOutcome::TimedOut | ProbeOutcome::UnknownHost | ProbeOutcome::Failed => false,
            }
        };

        self.verified.insert(host.to_string(), reachable);
        reachable
    }
}
