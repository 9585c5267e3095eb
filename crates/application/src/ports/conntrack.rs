use async_trait::async_trait;
use domainwall_domain::{DnsFlow, DomainError, TransportProtocol};
use std::net::SocketAddr;

/// A tracked connection as recorded by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConntrackEntry {
    pub protocol: TransportProtocol,
    pub original_src: SocketAddr,
    pub original_dst: SocketAddr,
    pub reply_src: SocketAddr,
    pub reply_dst: SocketAddr,
}

impl ConntrackEntry {
    /// True when `response` travels back along this connection, observed
    /// either before or after reverse NAT.
    pub fn matches_response(&self, response: &DnsFlow) -> bool {
        self.protocol == response.protocol
            && (self.reply_dst == response.client || self.original_src == response.client)
            && (self.reply_src == response.server || self.original_dst == response.server)
    }

    /// The address the client asked for, and the one that actually answered.
    pub fn server_identities(&self) -> [SocketAddr; 2] {
        [self.original_dst, self.reply_src]
    }

    pub fn is_translated(&self) -> bool {
        self.original_dst != self.reply_src
    }
}

#[async_trait]
pub trait ConntrackLookup: Send + Sync {
    /// Finds the outgoing request a DNS response belongs to.
    async fn find_request(&self, response: &DnsFlow) -> Result<Option<ConntrackEntry>, DomainError>;
}
