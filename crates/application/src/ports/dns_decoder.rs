use domainwall_domain::{DomainError, ParsedDnsResponse, TransportProtocol};

/// Stateless DNS response decoder.
pub trait DnsMessageDecoder: Send + Sync {
    /// Returns a decode failure for truncated or garbled payloads; responses
    /// carrying no usable records decode to an empty answer list.
    fn decode(
        &self,
        payload: &[u8],
        protocol: TransportProtocol,
    ) -> Result<ParsedDnsResponse, DomainError>;
}
