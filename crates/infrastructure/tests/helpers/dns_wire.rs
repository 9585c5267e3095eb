#![allow(dead_code)]
//! Hand-encoded DNS responses, uncompressed.

use std::net::{Ipv4Addr, Ipv6Addr};

pub const TYPE_A: u16 = 1;
pub const TYPE_CNAME: u16 = 5;
pub const TYPE_MX: u16 = 15;
pub const TYPE_TXT: u16 = 16;
pub const TYPE_AAAA: u16 = 28;
pub const CLASS_IN: u16 = 1;
pub const CLASS_CH: u16 = 3;

pub const RCODE_NXDOMAIN: u8 = 3;
pub const OPCODE_NOTIFY: u8 = 4;

struct ResourceRecord {
    name: String,
    rtype: u16,
    class: u16,
    ttl: u32,
    rdata: Vec<u8>,
}

pub fn encode_name(name: &str, out: &mut Vec<u8>) {
    for label in name.trim_end_matches('.').split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
}

pub struct DnsResponseBuilder {
    id: u16,
    opcode: u8,
    rcode: u8,
    question: Option<(String, u16)>,
    answers: Vec<ResourceRecord>,
    additionals: Vec<ResourceRecord>,
}

impl DnsResponseBuilder {
    pub fn new(question: &str) -> Self {
        Self {
            id: 0x1234,
            opcode: 0,
            rcode: 0,
            question: Some((question.to_string(), TYPE_A)),
            answers: Vec::new(),
            additionals: Vec::new(),
        }
    }

    pub fn without_question() -> Self {
        Self {
            question: None,
            ..Self::new("unused")
        }
    }

    pub fn opcode(mut self, opcode: u8) -> Self {
        self.opcode = opcode;
        self
    }

    pub fn rcode(mut self, rcode: u8) -> Self {
        self.rcode = rcode;
        self
    }

    fn record(name: &str, rtype: u16, class: u16, ttl: u32, rdata: Vec<u8>) -> ResourceRecord {
        ResourceRecord {
            name: name.to_string(),
            rtype,
            class,
            ttl,
            rdata,
        }
    }

    pub fn a(mut self, name: &str, ip: &str, ttl: u32) -> Self {
        let ip: Ipv4Addr = ip.parse().unwrap();
        self.answers
            .push(Self::record(name, TYPE_A, CLASS_IN, ttl, ip.octets().to_vec()));
        self
    }

    pub fn aaaa(mut self, name: &str, ip: &str, ttl: u32) -> Self {
        let ip: Ipv6Addr = ip.parse().unwrap();
        self.answers
            .push(Self::record(name, TYPE_AAAA, CLASS_IN, ttl, ip.octets().to_vec()));
        self
    }

    pub fn cname(mut self, name: &str, target: &str, ttl: u32) -> Self {
        let mut rdata = Vec::new();
        encode_name(target, &mut rdata);
        self.answers
            .push(Self::record(name, TYPE_CNAME, CLASS_IN, ttl, rdata));
        self
    }

    pub fn mx(mut self, name: &str, exchange: &str, ttl: u32) -> Self {
        let mut rdata = 10u16.to_be_bytes().to_vec();
        encode_name(exchange, &mut rdata);
        self.answers.push(Self::record(name, TYPE_MX, CLASS_IN, ttl, rdata));
        self
    }

    pub fn txt(mut self, name: &str, text: &str, ttl: u32) -> Self {
        let mut rdata = vec![text.len() as u8];
        rdata.extend_from_slice(text.as_bytes());
        self.answers.push(Self::record(name, TYPE_TXT, CLASS_IN, ttl, rdata));
        self
    }

    /// An A record in a non-IN class.
    pub fn chaos_a(mut self, name: &str, ip: &str, ttl: u32) -> Self {
        let ip: Ipv4Addr = ip.parse().unwrap();
        self.answers
            .push(Self::record(name, TYPE_A, CLASS_CH, ttl, ip.octets().to_vec()));
        self
    }

    pub fn additional_a(mut self, name: &str, ip: &str, ttl: u32) -> Self {
        let ip: Ipv4Addr = ip.parse().unwrap();
        self.additionals
            .push(Self::record(name, TYPE_A, CLASS_IN, ttl, ip.octets().to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(512);
        out.extend_from_slice(&self.id.to_be_bytes());
        // QR=1, RD=1, RA=1
        let flags: u16 = 0x8000 | ((self.opcode as u16 & 0x0F) << 11) | 0x0100 | 0x0080
            | (self.rcode as u16 & 0x0F);
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&(self.question.is_some() as u16).to_be_bytes());
        out.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(self.additionals.len() as u16).to_be_bytes());

        if let Some((name, qtype)) = &self.question {
            encode_name(name, &mut out);
            out.extend_from_slice(&qtype.to_be_bytes());
            out.extend_from_slice(&CLASS_IN.to_be_bytes());
        }
        for rr in self.answers.iter().chain(self.additionals.iter()) {
            encode_name(&rr.name, &mut out);
            out.extend_from_slice(&rr.rtype.to_be_bytes());
            out.extend_from_slice(&rr.class.to_be_bytes());
            out.extend_from_slice(&rr.ttl.to_be_bytes());
            out.extend_from_slice(&(rr.rdata.len() as u16).to_be_bytes());
            out.extend_from_slice(&rr.rdata);
        }
        out
    }

    /// Message framed with the DNS-over-TCP length prefix.
    pub fn build_tcp(&self) -> Vec<u8> {
        let message = self.build();
        let mut out = (message.len() as u16).to_be_bytes().to_vec();
        out.extend_from_slice(&message);
        out
    }
}
