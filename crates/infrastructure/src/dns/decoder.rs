use domainwall_application::ports::DnsMessageDecoder;
use domainwall_domain::{
    DnsAnswer, DomainError, DomainName, MappingValue, ParsedDnsResponse, TransportProtocol,
};
use hickory_proto::op::Message;
use hickory_proto::rr::{DNSClass, RData, Record};
use std::net::IpAddr;
use tracing::debug;

/// Keepalive datagrams sent by some health checkers to the DNS port.
const PING_PREFIX: &[u8] = b"UDP PING";
const HEADER_LEN: usize = 12;
const OPCODE_QUERY: u16 = 0;

/// Stateless decoder for snooped DNS responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct HickoryDnsDecoder;

impl HickoryDnsDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl DnsMessageDecoder for HickoryDnsDecoder {
    fn decode(
        &self,
        payload: &[u8],
        protocol: TransportProtocol,
    ) -> Result<ParsedDnsResponse, DomainError> {
        if payload.starts_with(PING_PREFIX) {
            return Ok(ParsedDnsResponse::empty());
        }

        let wire = match protocol {
            TransportProtocol::Udp => payload,
            TransportProtocol::Tcp => strip_length_prefix(payload)?,
        };

        if wire.len() < HEADER_LEN {
            return Err(DomainError::InvalidDnsMessage(format!(
                "message too short: {} bytes",
                wire.len()
            )));
        }

        let id = u16::from_be_bytes([wire[0], wire[1]]);
        let flags = u16::from_be_bytes([wire[2], wire[3]]);
        let opcode = (flags >> 11) & 0x0F;
        if opcode != OPCODE_QUERY {
            debug!(id, opcode, "Ignoring non-query DNS message");
            return Ok(ParsedDnsResponse::empty());
        }

        let qdcount = u16::from_be_bytes([wire[4], wire[5]]);
        if qdcount == 0 {
            return Err(DomainError::InvalidDnsMessage(
                "response has no question".to_string(),
            ));
        }

        let message = Message::from_vec(wire)
            .map_err(|e| DomainError::InvalidDnsMessage(format!("parse failed: {}", e)))?;

        let question_name = message
            .queries()
            .first()
            .and_then(|q| DomainName::new(&q.name().to_utf8()).ok());

        let answers: Vec<DnsAnswer> = message
            .answers()
            .iter()
            .chain(message.additionals().iter())
            .filter_map(answer_from_record)
            .collect();

        debug!(
            id,
            rcode = ?message.response_code(),
            answers = answers.len(),
            "DNS response decoded"
        );

        Ok(ParsedDnsResponse {
            id,
            question_name,
            answers,
        })
    }
}

fn answer_from_record(record: &Record) -> Option<DnsAnswer> {
    if record.dns_class() != DNSClass::IN {
        return None;
    }

    let value = match record.data() {
        RData::A(a) => MappingValue::Ip(IpAddr::V4(a.0)),
        RData::AAAA(aaaa) => MappingValue::Ip(IpAddr::V6(aaaa.0)),
        RData::CNAME(canonical) => MappingValue::Name(DomainName::new(&canonical.to_utf8()).ok()?),
        _ => return None,
    };

    let name = DomainName::new(&record.name().to_utf8()).ok()?;

    Some(DnsAnswer {
        name,
        value,
        ttl: record.ttl(),
    })
}

/// DNS over TCP prefixes each message with its 2-byte length.
fn strip_length_prefix(segment: &[u8]) -> Result<&[u8], DomainError> {
    if segment.len() < 2 {
        return Err(DomainError::InvalidDnsMessage(
            "TCP segment shorter than length prefix".to_string(),
        ));
    }
    let len = u16::from_be_bytes([segment[0], segment[1]]) as usize;
    segment.get(2..2 + len).ok_or_else(|| {
        DomainError::InvalidDnsMessage(format!(
            "TCP segment holds {} of {} message bytes",
            segment.len() - 2,
            len
        ))
    })
}
