#![allow(dead_code)]
//! Raw IP packets as the kernel queue hands them over.

use std::net::{IpAddr, SocketAddr};

const PROTO_TCP: u8 = 6;
const PROTO_UDP: u8 = 17;

fn ipv4_header(src: IpAddr, dst: IpAddr, protocol: u8, transport_len: usize) -> Vec<u8> {
    let (IpAddr::V4(src), IpAddr::V4(dst)) = (src, dst) else {
        panic!("IPv4 addresses required");
    };
    let total = (20 + transport_len) as u16;
    let mut header = vec![0x45, 0];
    header.extend_from_slice(&total.to_be_bytes());
    header.extend_from_slice(&[0, 0, 0x40, 0, 64, protocol, 0, 0]);
    header.extend_from_slice(&src.octets());
    header.extend_from_slice(&dst.octets());
    header
}

fn ipv6_header(src: IpAddr, dst: IpAddr, protocol: u8, transport_len: usize) -> Vec<u8> {
    let (IpAddr::V6(src), IpAddr::V6(dst)) = (src, dst) else {
        panic!("IPv6 addresses required");
    };
    let mut header = vec![0x60, 0, 0, 0];
    header.extend_from_slice(&(transport_len as u16).to_be_bytes());
    header.extend_from_slice(&[protocol, 64]);
    header.extend_from_slice(&src.octets());
    header.extend_from_slice(&dst.octets());
    header
}

fn udp_segment(src: SocketAddr, dst: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut segment = Vec::with_capacity(8 + payload.len());
    segment.extend_from_slice(&src.port().to_be_bytes());
    segment.extend_from_slice(&dst.port().to_be_bytes());
    segment.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    segment.extend_from_slice(&[0, 0]);
    segment.extend_from_slice(payload);
    segment
}

fn tcp_segment(src: SocketAddr, dst: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut segment = Vec::with_capacity(20 + payload.len());
    segment.extend_from_slice(&src.port().to_be_bytes());
    segment.extend_from_slice(&dst.port().to_be_bytes());
    segment.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0]);
    // Data offset 5 words, PSH|ACK.
    segment.extend_from_slice(&[0x50, 0x18, 0xFF, 0xFF, 0, 0, 0, 0]);
    segment.extend_from_slice(payload);
    segment
}

fn wrap(src: SocketAddr, dst: SocketAddr, protocol: u8, segment: Vec<u8>) -> Vec<u8> {
    let mut packet = match src.ip() {
        IpAddr::V4(_) => ipv4_header(src.ip(), dst.ip(), protocol, segment.len()),
        IpAddr::V6(_) => ipv6_header(src.ip(), dst.ip(), protocol, segment.len()),
    };
    packet.extend_from_slice(&segment);
    packet
}

/// A UDP datagram from `src` to `dst`.
pub fn udp_packet(src: &str, dst: &str, payload: &[u8]) -> Vec<u8> {
    let src: SocketAddr = src.parse().unwrap();
    let dst: SocketAddr = dst.parse().unwrap();
    wrap(src, dst, PROTO_UDP, udp_segment(src, dst, payload))
}

/// A TCP segment from `src` to `dst`.
pub fn tcp_packet(src: &str, dst: &str, payload: &[u8]) -> Vec<u8> {
    let src: SocketAddr = src.parse().unwrap();
    let dst: SocketAddr = dst.parse().unwrap();
    wrap(src, dst, PROTO_TCP, tcp_segment(src, dst, payload))
}

/// First packet of a connection from a workload to `dst_ip:443`.
pub fn connection_attempt(dst_ip: &str) -> Vec<u8> {
    let dst: IpAddr = dst_ip.parse().unwrap();
    let src = match dst {
        IpAddr::V4(_) => "10.0.1.5:51000",
        IpAddr::V6(_) => "[fd00::5]:51000",
    };
    tcp_packet(src, &SocketAddr::new(dst, 443).to_string(), b"")
}
