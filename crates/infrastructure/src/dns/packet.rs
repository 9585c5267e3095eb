//! Minimal IPv4/IPv6 + UDP/TCP dissection for packets handed over by the
//! kernel queue. Only what the engine needs is read: addresses, ports and the
//! transport payload.

use bytes::Bytes;
use domainwall_domain::{DnsFlow, DnsObservation, DomainError, TransportProtocol};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

const IPV4_MIN_HEADER: usize = 20;
const IPV6_HEADER: usize = 40;
const UDP_HEADER: usize = 8;
const TCP_MIN_HEADER: usize = 20;

const PROTO_TCP: u8 = 6;
const PROTO_UDP: u8 = 17;

const IPV6_HOP_BY_HOP: u8 = 0;
const IPV6_ROUTING: u8 = 43;
const IPV6_FRAGMENT: u8 = 44;
const IPV6_DEST_OPTS: u8 = 60;

/// A transport segment located inside an IP packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dissected {
    pub src: SocketAddr,
    pub dst: SocketAddr,
    pub protocol: TransportProtocol,
    pub payload: Bytes,
}

impl Dissected {
    /// Interprets the packet as a DNS response travelling server to client.
    pub fn into_observation(self) -> DnsObservation {
        DnsObservation {
            flow: DnsFlow {
                client: self.dst,
                server: self.src,
                protocol: self.protocol,
            },
            payload: self.payload,
        }
    }
}

fn invalid(reason: impl Into<String>) -> DomainError {
    DomainError::InvalidPacket(reason.into())
}

struct NetworkLayer {
    src: IpAddr,
    dst: IpAddr,
    protocol: u8,
    transport_offset: usize,
    end: usize,
}

fn network_layer(packet: &[u8]) -> Result<NetworkLayer, DomainError> {
    let first = *packet.first().ok_or_else(|| invalid("empty packet"))?;
    match first >> 4 {
        4 => ipv4_layer(packet),
        6 => ipv6_layer(packet),
        v => Err(invalid(format!("unsupported IP version {}", v))),
    }
}

fn ipv4_layer(packet: &[u8]) -> Result<NetworkLayer, DomainError> {
    if packet.len() < IPV4_MIN_HEADER {
        return Err(invalid("truncated IPv4 header"));
    }
    let header_len = ((packet[0] & 0x0F) as usize) * 4;
    let total_len = u16::from_be_bytes([packet[2], packet[3]]) as usize;
    if header_len < IPV4_MIN_HEADER || total_len < header_len || total_len > packet.len() {
        return Err(invalid("inconsistent IPv4 lengths"));
    }

    let frag = u16::from_be_bytes([packet[6], packet[7]]);
    let more_fragments = frag & 0x2000 != 0;
    if more_fragments || frag & 0x1FFF != 0 {
        return Err(invalid("fragmented IPv4 packet"));
    }

    Ok(NetworkLayer {
        src: IpAddr::V4(Ipv4Addr::new(packet[12], packet[13], packet[14], packet[15])),
        dst: IpAddr::V4(Ipv4Addr::new(packet[16], packet[17], packet[18], packet[19])),
        protocol: packet[9],
        transport_offset: header_len,
        end: total_len,
    })
}

fn ipv6_layer(packet: &[u8]) -> Result<NetworkLayer, DomainError> {
    if packet.len() < IPV6_HEADER {
        return Err(invalid("truncated IPv6 header"));
    }
    let payload_len = u16::from_be_bytes([packet[4], packet[5]]) as usize;
    let end = IPV6_HEADER + payload_len;
    if end > packet.len() {
        return Err(invalid("inconsistent IPv6 payload length"));
    }

    let mut src = [0u8; 16];
    let mut dst = [0u8; 16];
    src.copy_from_slice(&packet[8..24]);
    dst.copy_from_slice(&packet[24..40]);

    let mut next = packet[6];
    let mut offset = IPV6_HEADER;
    loop {
        match next {
            IPV6_HOP_BY_HOP | IPV6_ROUTING | IPV6_DEST_OPTS => {
                if offset + 2 > end {
                    return Err(invalid("truncated IPv6 extension header"));
                }
                next = packet[offset];
                offset += (packet[offset + 1] as usize + 1) * 8;
            }
            IPV6_FRAGMENT => return Err(invalid("fragmented IPv6 packet")),
            _ => break,
        }
    }

    Ok(NetworkLayer {
        src: IpAddr::V6(Ipv6Addr::from(src)),
        dst: IpAddr::V6(Ipv6Addr::from(dst)),
        protocol: next,
        transport_offset: offset,
        end,
    })
}

/// Locates the UDP or TCP payload of a raw IP packet.
pub fn dissect(packet: &[u8]) -> Result<Dissected, DomainError> {
    let net = network_layer(packet)?;
    let segment = packet
        .get(net.transport_offset..net.end)
        .ok_or_else(|| invalid("transport header out of bounds"))?;

    let (protocol, header_len) = match net.protocol {
        PROTO_UDP => {
            if segment.len() < UDP_HEADER {
                return Err(invalid("truncated UDP header"));
            }
            (TransportProtocol::Udp, UDP_HEADER)
        }
        PROTO_TCP => {
            if segment.len() < TCP_MIN_HEADER {
                return Err(invalid("truncated TCP header"));
            }
            let data_offset = ((segment[12] >> 4) as usize) * 4;
            if data_offset < TCP_MIN_HEADER || data_offset > segment.len() {
                return Err(invalid("bad TCP data offset"));
            }
            (TransportProtocol::Tcp, data_offset)
        }
        other => return Err(invalid(format!("unsupported transport protocol {}", other))),
    };

    let src_port = u16::from_be_bytes([segment[0], segment[1]]);
    let dst_port = u16::from_be_bytes([segment[2], segment[3]]);

    let payload_end = match protocol {
        TransportProtocol::Udp => {
            let udp_len = u16::from_be_bytes([segment[4], segment[5]]) as usize;
            if udp_len < UDP_HEADER || udp_len > segment.len() {
                return Err(invalid("inconsistent UDP length"));
            }
            udp_len
        }
        TransportProtocol::Tcp => segment.len(),
    };

    Ok(Dissected {
        src: SocketAddr::new(net.src, src_port),
        dst: SocketAddr::new(net.dst, dst_port),
        protocol,
        payload: Bytes::copy_from_slice(&segment[header_len..payload_end]),
    })
}

/// Destination address of a raw IP packet.
pub fn destination_ip(packet: &[u8]) -> Result<IpAddr, DomainError> {
    let first = *packet.first().ok_or_else(|| invalid("empty packet"))?;
    match first >> 4 {
        4 if packet.len() >= IPV4_MIN_HEADER => Ok(IpAddr::V4(Ipv4Addr::new(
            packet[16], packet[17], packet[18], packet[19],
        ))),
        6 if packet.len() >= IPV6_HEADER => {
            let mut dst = [0u8; 16];
            dst.copy_from_slice(&packet[24..40]);
            Ok(IpAddr::V6(Ipv6Addr::from(dst)))
        }
        _ => Err(invalid("not an IP packet")),
    }
}
