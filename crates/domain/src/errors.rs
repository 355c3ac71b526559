use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Query is empty after normalization")]
    EmptyQuery,

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid MX option: {0}")]
    InvalidMxOption(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("Domain does not exist: {0}")]
    NxDomain(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Transport timeout for server {server}")]
    TransportTimeout { server: String },

    #[error("Connection refused by server {server}")]
    TransportConnectionRefused { server: String },

    #[error("No nameserver reachable")]
    NoNameserverReachable,

    #[error("Worker pool '{0}' is shut down")]
    PoolShutdown(&'static str),

    #[error("Resolution engine is shut down")]
    EngineShutdown,

    #[error("Invalid pool parameters: {0}")]
    InvalidPoolParameters(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

impl DomainError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::QueryTimeout | Self::TransportTimeout { .. })
    }

    pub fn is_no_nameserver(&self) -> bool {
        matches!(
            self,
            Self::NoNameserverReachable | Self::TransportConnectionRefused { .. }
        )
    }

    /// Failures worth a single automatic retry.
    pub fn is_transient(&self) -> bool {
        self.is_timeout() || matches!(self, Self::IoError(_))
    }
}
