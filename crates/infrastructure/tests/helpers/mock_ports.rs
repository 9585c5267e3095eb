#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use domainwall_application::ports::{
    Clock, ConntrackEntry, ConntrackLookup, MembershipBackend, MembershipView,
};
use domainwall_domain::{
    DnsAnswer, DnsFlow, DomainError, DomainName, DomainRecord, MappingValue, SetId,
    TransportProtocol,
};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn name(raw: &str) -> DomainName {
    DomainName::new(raw).unwrap()
}

pub fn ip(raw: &str) -> IpAddr {
    raw.parse().unwrap()
}

pub fn ips(raw: &[&str]) -> BTreeSet<IpAddr> {
    raw.iter().map(|r| ip(r)).collect()
}

pub fn a_answer(domain: &str, addr: &str, ttl: u32) -> DnsAnswer {
    DnsAnswer {
        name: name(domain),
        value: MappingValue::Ip(ip(addr)),
        ttl,
    }
}

pub fn cname_answer(domain: &str, target: &str, ttl: u32) -> DnsAnswer {
    DnsAnswer {
        name: name(domain),
        value: MappingValue::Name(name(target)),
        ttl,
    }
}

pub fn ip_record(domain: &str, addr: &str, expiry: DateTime<Utc>) -> DomainRecord {
    DomainRecord::new(name(domain), MappingValue::Ip(ip(addr)), expiry)
}

pub fn name_record(domain: &str, target: &str, expiry: DateTime<Utc>) -> DomainRecord {
    DomainRecord::new(name(domain), MappingValue::Name(name(target)), expiry)
}

// ── Clock ───────────────────────────────────────────────────────────────────

pub struct MockClock {
    now: RwLock<DateTime<Utc>>,
}

impl MockClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.write().unwrap() += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

// ── Conntrack ───────────────────────────────────────────────────────────────

pub struct MockConntrack {
    entries: RwLock<Vec<ConntrackEntry>>,
    call_count: AtomicU64,
}

impl MockConntrack {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            call_count: AtomicU64::new(0),
        }
    }

    /// Records an untranslated UDP request from `client` to `server`.
    pub fn add_udp_request(&self, client: &str, server: &str) {
        let client = client.parse().unwrap();
        let server = server.parse().unwrap();
        self.entries.write().unwrap().push(ConntrackEntry {
            protocol: TransportProtocol::Udp,
            original_src: client,
            original_dst: server,
            reply_src: server,
            reply_dst: client,
        });
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConntrackLookup for MockConntrack {
    async fn find_request(&self, response: &DnsFlow) -> Result<Option<ConntrackEntry>, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.matches_response(response))
            .copied())
    }
}

// ── Membership backend ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Add(String, IpAddr),
    Remove(String, IpAddr),
}

#[derive(Clone)]
pub struct MockMembershipBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    should_fail: Arc<AtomicBool>,
    delay: Arc<RwLock<std::time::Duration>>,
}

impl MockMembershipBackend {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(AtomicBool::new(false)),
            delay: Arc::new(RwLock::new(std::time::Duration::ZERO)),
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Simulates a slow dataplane.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.write().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn record(&self, call: BackendCall) -> Result<(), DomainError> {
        let delay = *self.delay.read().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::MembershipBackend("ipset unavailable".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl MembershipBackend for MockMembershipBackend {
    async fn add_member(&self, set_id: &SetId, ip: IpAddr) -> Result<(), DomainError> {
        self.record(BackendCall::Add(set_id.to_string(), ip)).await
    }

    async fn remove_member(&self, set_id: &SetId, ip: IpAddr) -> Result<(), DomainError> {
        self.record(BackendCall::Remove(set_id.to_string(), ip)).await
    }
}

// ── Membership view ─────────────────────────────────────────────────────────

/// A view driven directly by the test.
pub struct ManualView {
    members: RwLock<BTreeSet<IpAddr>>,
    added: broadcast::Sender<IpAddr>,
}

impl ManualView {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(BTreeSet::new()),
            added: broadcast::channel(16).0,
        }
    }

    pub fn add(&self, ip: IpAddr) {
        self.members.write().unwrap().insert(ip);
        let _ = self.added.send(ip);
    }
}

impl MembershipView for ManualView {
    fn contains(&self, ip: &IpAddr) -> bool {
        self.members.read().unwrap().contains(ip)
    }

    fn subscribe(&self) -> broadcast::Receiver<IpAddr> {
        self.added.subscribe()
    }
}
