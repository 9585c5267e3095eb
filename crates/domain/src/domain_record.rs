use crate::domain_name::DomainName;
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    A,
    AAAA,
    CNAME,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::AAAA => "AAAA",
            RecordKind::CNAME => "CNAME",
        }
    }
}

/// Right-hand side of a mapping: an address, or the target of a CNAME.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MappingValue {
    Ip(IpAddr),
    Name(DomainName),
}

impl MappingValue {
    pub fn kind(&self) -> RecordKind {
        match self {
            MappingValue::Ip(IpAddr::V4(_)) => RecordKind::A,
            MappingValue::Ip(IpAddr::V6(_)) => RecordKind::AAAA,
            MappingValue::Name(_) => RecordKind::CNAME,
        }
    }

    /// Tag used by the persistence file's `Type` field.
    pub fn type_tag(&self) -> &'static str {
        match self {
            MappingValue::Ip(_) => "ip",
            MappingValue::Name(_) => "name",
        }
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            MappingValue::Ip(ip) => Some(*ip),
            MappingValue::Name(_) => None,
        }
    }
}

impl fmt::Display for MappingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingValue::Ip(ip) => write!(f, "{}", ip),
            MappingValue::Name(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    pub domain: DomainName,
    pub value: MappingValue,
    pub expiry: DateTime<Utc>,
}

impl DomainRecord {
    pub fn new(domain: DomainName, value: MappingValue, expiry: DateTime<Utc>) -> Self {
        Self {
            domain,
            value,
            expiry,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.value.kind()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}
