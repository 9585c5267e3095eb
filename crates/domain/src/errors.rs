use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidDomainPattern(String),

    #[error("Invalid DNS message: {0}")]
    InvalidDnsMessage(String),

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("CNAME cycle detected while resolving {0}")]
    CnameCycle(String),

    #[error("CNAME chain for {domain} exceeds maximum depth {max_depth}")]
    CnameDepthExceeded { domain: String, max_depth: usize },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Unsupported persistence file version: {0}")]
    UnsupportedPersistenceVersion(String),

    #[error("Persistence epoch mismatch: file has {found}, expected {expected}")]
    EpochMismatch { found: i64, expected: i64 },

    #[error("Persistence file requires unsupported features: {0:?}")]
    UnsupportedFeatures(Vec<String>),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Conntrack lookup failed: {0}")]
    Conntrack(String),

    #[error("Membership backend error: {0}")]
    MembershipBackend(String),

    #[error("Packet queue disconnected: {0}")]
    QueueDisconnected(String),

    #[error("Packet queue transport error: {0}")]
    QueueTransport(String),

    #[error("Domain set not found: {0}")]
    DomainSetNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DomainError {
    /// Resolution failures are expected on attacker-influenced CNAME graphs
    /// and must not be escalated.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            DomainError::CnameCycle(_) | DomainError::CnameDepthExceeded { .. }
        )
    }
}
