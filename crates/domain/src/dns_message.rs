use crate::domain_name::DomainName;
use crate::domain_record::{MappingValue, RecordKind};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportProtocol {
    Udp,
    Tcp,
}

impl TransportProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProtocol::Udp => "udp",
            TransportProtocol::Tcp => "tcp",
        }
    }
}

/// Addressing of an observed DNS response.
///
/// `server` is the response's source, `client` its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DnsFlow {
    pub client: SocketAddr,
    pub server: SocketAddr,
    pub protocol: TransportProtocol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsAnswer {
    pub name: DomainName,
    pub value: MappingValue,
    pub ttl: u32,
}

impl DnsAnswer {
    pub fn kind(&self) -> RecordKind {
        self.value.kind()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDnsResponse {
    pub id: u16,
    pub question_name: Option<DomainName>,
    /// A, AAAA and CNAME records from the answer and additional sections.
    pub answers: Vec<DnsAnswer>,
}

impl ParsedDnsResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }
}

/// A DNS payload carved out of a captured packet.
#[derive(Debug, Clone)]
pub struct DnsObservation {
    pub flow: DnsFlow,
    pub payload: bytes::Bytes,
}
