use chrono::{DateTime, Utc};
use domainwall_domain::{DnsAnswer, DomainError, DomainName, DomainRecord};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Names whose resolved address set may have changed, including every name
/// that reaches a changed name through CNAME edges.
#[derive(Debug, Default, Clone)]
pub struct StoreMutation {
    pub changed: Vec<DomainName>,
    pub ignored: usize,
}

#[derive(Debug, Default, Clone)]
pub struct SweepOutcome {
    pub changed: Vec<DomainName>,
    pub expired: usize,
    pub collected: usize,
    pub remaining: usize,
}

/// Authoritative domain to address map.
///
/// Implementations must let readers run concurrently with writers without
/// exposing half-applied updates or expired values.
pub trait MappingStorePort: Send + Sync {
    fn ingest(&self, answers: &[DnsAnswer], observed_at: DateTime<Utc>) -> StoreMutation;

    /// Inserts records that already carry an absolute expiry.
    fn restore(&self, records: Vec<DomainRecord>) -> StoreMutation;

    /// Addresses reachable from `domain` through live CNAME chains.
    fn lookup_ips(&self, domain: &DomainName) -> Result<BTreeSet<IpAddr>, DomainError>;

    fn expire_sweep(&self, now: DateTime<Utc>) -> SweepOutcome;

    fn expire_all(&self) -> Vec<DomainName>;

    fn snapshot(&self) -> Vec<DomainRecord>;

    fn names(&self) -> Vec<DomainName>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
