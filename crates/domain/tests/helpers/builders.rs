#![allow(dead_code)]
use chrono::{DateTime, Duration, TimeZone, Utc};
use domainwall_domain::{DomainName, DomainPattern, DomainRecord, MappingValue};
use std::net::IpAddr;

pub fn name(raw: &str) -> DomainName {
    DomainName::new(raw).unwrap()
}

pub fn pattern(raw: &str) -> DomainPattern {
    DomainPattern::parse(raw).unwrap()
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub struct DomainRecordBuilder {
    domain: DomainName,
    value: MappingValue,
    expiry: DateTime<Utc>,
}

impl DomainRecordBuilder {
    pub fn new() -> Self {
        Self {
            domain: name("example.com"),
            value: MappingValue::Ip("1.2.3.4".parse().unwrap()),
            expiry: t0() + Duration::seconds(60),
        }
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = name(domain);
        self
    }

    pub fn ip(mut self, ip: &str) -> Self {
        self.value = MappingValue::Ip(ip.parse::<IpAddr>().unwrap());
        self
    }

    pub fn cname(mut self, target: &str) -> Self {
        self.value = MappingValue::Name(name(target));
        self
    }

    pub fn expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn build(self) -> DomainRecord {
        DomainRecord::new(self.domain, self.value, self.expiry)
    }
}
