use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Connected,
    /// The host answered with a reset, so it exists.
    Refused,
    TimedOut,
    UnknownHost,
    Failed,
}

/// TCP reachability check of a mail server.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> ProbeOutcome;
}
