use async_trait::async_trait;
use ipscope_application::ports::{ProbeOutcome, ReachabilityProbe};
use ipscope_domain::config::MxConfig;
use std::io;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

/// Checks that a mail server accepts TCP connections on its SMTP port.
///
/// Host resolution is bounded by `read_timeout`, the connect by
/// `connect_timeout`. The connection is dropped as soon as it is open.
pub struct TcpReachabilityProbe {
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpReachabilityProbe {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            read_timeout,
        }
    }

    pub fn from_config(config: &MxConfig) -> Self {
        Self::new(config.connect_timeout(), config.read_timeout())
    }
}

#[async_trait]
impl ReachabilityProbe for TcpReachabilityProbe {
    async fn probe(&self, host: &str, port: u16) -> ProbeOutcome {
        let host = host.trim_end_matches('.');

        let addr = match tokio::time::timeout(self.read_timeout, lookup_host((host, port))).await {
            Ok(Ok(mut addrs)) => match addrs.next() {
                Some(addr) => addr,
                None => return ProbeOutcome::UnknownHost,
            },
            Ok(Err(e)) => {
                debug!(host, error = %e, "Probe host did not resolve");
                return ProbeOutcome::UnknownHost;
            }
            Err(_) => {
                debug!(host, "Probe host resolution timed out");
                return ProbeOutcome::UnknownHost;
            }
        };

        let outcome = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => ProbeOutcome::Connected,
            Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => ProbeOutcome::Refused,
            Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => ProbeOutcome::TimedOut,
            Ok(Err(e)) => {
                debug!(host, %addr, error = %e, "Probe connect failed");
                ProbeOutcome::Failed
            }
            Err(_) => ProbeOutcome::TimedOut,
        };

        debug!(host, %addr, outcome = ?outcome, "Probe finished");
        outcome
    }
}
