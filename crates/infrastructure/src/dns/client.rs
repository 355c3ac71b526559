use super::message_builder::MessageBuilder;
use super::response_parser::{DnsResponse, ResponseParser};
use super::transport::{tcp::TcpTransport, udp::UdpTransport, Transport};
use super::upstream::UpstreamPool;
use async_trait::async_trait;
use ipscope_application::ports::{DnsClient, HostAddress, MxAnswer, ResolverProfile};
use ipscope_domain::config::ResolverConfig;
use ipscope_domain::{DomainError, LookupType};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Per-attempt timeout and extra attempts over the whole upstream list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupProfile {
    pub timeout: Duration,
    pub retries: u32,
}

impl LookupProfile {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }
}

#[derive(Default)]
struct FailureTally {
    attempts: usize,
    timeouts: usize,
    refused: usize,
    last: Option<DomainError>,
}

impl FailureTally {
    fn record(&mut self, error: DomainError) {
        self.attempts += 1;
        if error.is_timeout() {
            self.timeouts += 1;
        } else if error.is_no_nameserver() {
            self.refused += 1;
        }
        self.last = Some(error);
    }

    fn into_error(self) -> DomainError {
        if self.timeouts > 0 {
            return DomainError::QueryTimeout;
        }
        if self.attempts == 0 || self.refused == self.attempts {
            return DomainError::NoNameserverReachable;
        }
        match self.last {
            Some(DomainError::IoError(reason)) => DomainError::IoError(reason),
            Some(other) => DomainError::IoError(other.to_string()),
            None => DomainError::IoError("no answer from upstream".to_string()),
        }
    }
}

/// [`DnsClient`] over raw hickory-proto messages sent to an [`UpstreamPool`].
///
/// Each attempt walks the upstream list in order; the first usable answer
/// wins. NXDOMAIN ends the lookup at once.
pub struct HickoryDnsClient {
    upstreams: Arc<UpstreamPool>,
    primary: LookupProfile,
    recheck: LookupProfile,
    tcp_on_truncation: bool,
}

impl HickoryDnsClient {
    pub fn new(upstreams: Arc<UpstreamPool>, primary: LookupProfile, recheck: LookupProfile) -> Self {
        Self {
            upstreams,
            primary,
            recheck,
            tcp_on_truncation: true,
        }
    }

    pub fn from_config(config: &ResolverConfig, upstreams: Arc<UpstreamPool>) -> Self {
        Self::new(
            upstreams,
            LookupProfile::new(config.timeout(), config.retries),
            LookupProfile::new(config.recheck_timeout(), config.recheck_retries),
        )
        .with_tcp_on_truncation(config.tcp_on_truncation)
    }

    pub fn with_tcp_on_truncation(mut self, enabled: bool) -> Self {
        self.tcp_on_truncation = enabled;
        self
    }

    pub fn upstreams(&self) -> &Arc<UpstreamPool> {
        &self.upstreams
    }

    fn profile(&self, profile: ResolverProfile) -> LookupProfile {
        match profile {
            ResolverProfile::Primary => self.primary,
            ResolverProfile::Recheck => self.recheck,
        }
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn query(
        &self,
        name: &str,
        lookup: LookupType,
        profile: ResolverProfile,
    ) -> Result<DnsResponse, DomainError> {
        let settings = self.profile(profile);
        let (id, bytes) = MessageBuilder::build_query(name, lookup)?;
        let mut failures = FailureTally::default();

        for attempt in 0..=settings.retries {
            for server in self.upstreams.ordered() {
                match self.exchange(server, id, &bytes, settings.timeout).await {
                    Ok(response) if response.is_nxdomain() => {
                        return Err(DomainError::NxDomain(name.to_string()));
                    }
                    Ok(response) if response.is_server_error() => {
                        let status = ResponseParser::rcode_to_status(response.rcode);
                        debug!(%server, attempt, status, "Upstream answered with an error");
                        failures.record(DomainError::IoError(format!("{} from {}", status, server)));
                    }
                    Ok(response) => return Ok(response),
                    Err(e) => {
                        debug!(%server, attempt, error = %e, "Upstream attempt failed");
                        failures.record(e);
                    }
                }
            }
        }

        let error = failures.into_error();
        debug!(name, lookup = %lookup, error = %error, "Lookup failed");
        Err(error)
    }

    async fn exchange(
        &self,
        server: SocketAddr,
        id: u16,
        bytes: &[u8],
        timeout: Duration,
    ) -> Result<DnsResponse, DomainError> {
        let udp = Transport::Udp(UdpTransport::new(server));
        let raw = udp.send(bytes, timeout).await?;
        let response = ResponseParser::parse_bytes(raw.bytes)?;

        if response.id != id {
            return Err(DomainError::InvalidDnsResponse(format!(
                "response ID {} does not match query ID {} from {}",
                response.id, id, server
            )));
        }

        if !response.truncated || !self.tcp_on_truncation {
            return Ok(response);
        }

        debug!(%server, "Truncated UDP answer, retrying over TCP");
        let tcp = Transport::Tcp(TcpTransport::new(server));
        match tcp.send(bytes, timeout).await {
            Ok(raw) => ResponseParser::parse_bytes(raw.bytes),
            Err(e) => {
                warn!(%server, error = %e, "TCP retry failed, using truncated answer");
                Ok(response)
            }
        }
    }
}

fn empty_on_nxdomain(result: Result<Vec<String>, DomainError>) -> Result<Vec<String>, DomainError> {
    match result {
        Err(DomainError::NxDomain(_)) => Ok(Vec::new()),
        other => other,
    }
}

#[async_trait]
impl DnsClient for HickoryDnsClient {
    async fn lookup_a(
        &self,
        name: &str,
        profile: ResolverProfile,
    ) -> Result<Vec<HostAddress>, DomainError> {
        let response = self.query(name, LookupType::A, profile).await?;
        Ok(response.host_addresses())
    }

    async fn lookup_mx(
        &self,
        name: &str,
        profile: ResolverProfile,
    ) -> Result<MxAnswer, DomainError> {
        let response = self.query(name, LookupType::Mx, profile).await?;
        Ok(response.mx_answer())
    }

    async fn lookup_txt(
        &self,
        name: &str,
        profile: ResolverProfile,
    ) -> Result<Vec<String>, DomainError> {
        let result = self
            .query(name, LookupType::Txt, profile)
            .await
            .map(|response| response.txt_strings());
        empty_on_nxdomain(result)
    }

    async fn lookup_ptr(
        &self,
        ip: Ipv4Addr,
        profile: ResolverProfile,
    ) -> Result<Vec<String>, DomainError> {
        let name = MessageBuilder::reverse_name(ip);
        let result = self
            .query(&name, LookupType::Ptr, profile)
            .await
            .map(|response| response.ptr_names());
        empty_on_nxdomain(result)
    }

    fn switch_to_fallback(&self) -> bool {
        self.upstreams.switch_to_fallback()
    }

    fn is_using_fallback(&self) -> bool {
        self.upstreams.is_using_fallback()
    }
}
