#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use domainwall_application::ports::{
    Clock, MappingPersistencePort, MappingStorePort, MembershipProjectorPort, ProjectionTicket,
    StoreMutation, SweepOutcome,
};
use domainwall_domain::{
    DnsAnswer, DomainError, DomainName, DomainPattern, DomainRecord, MappingValue, SetId,
};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn record(domain: &str, addr: &str) -> DomainRecord {
    DomainRecord::new(
        DomainName::new(domain).unwrap(),
        MappingValue::Ip(addr.parse().unwrap()),
        t0(),
    )
}

pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        t0()
    }
}

/// Store double: sweeps report whatever the test queued, snapshots return
/// the configured records.
pub struct MockMappingStore {
    records: Mutex<Vec<DomainRecord>>,
    sweep_results: Mutex<Vec<SweepOutcome>>,
    sweep_calls: AtomicU64,
}

impl MockMappingStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            sweep_results: Mutex::new(Vec::new()),
            sweep_calls: AtomicU64::new(0),
        }
    }

    pub fn with_records(records: Vec<DomainRecord>) -> Self {
        let store = Self::new();
        *store.records.lock().unwrap() = records;
        store
    }

    pub fn push_sweep(&self, changed: &[&str], expired: usize) {
        self.sweep_results.lock().unwrap().push(SweepOutcome {
            changed: changed.iter().map(|d| DomainName::new(d).unwrap()).collect(),
            expired,
            collected: expired,
            remaining: 0,
        });
    }

    pub fn sweep_calls(&self) -> u64 {
        self.sweep_calls.load(Ordering::Relaxed)
    }
}

impl MappingStorePort for MockMappingStore {
    fn ingest(&self, _answers: &[DnsAnswer], _observed_at: DateTime<Utc>) -> StoreMutation {
        StoreMutation::default()
    }

    fn restore(&self, _records: Vec<DomainRecord>) -> StoreMutation {
        StoreMutation::default()
    }

    fn lookup_ips(&self, _domain: &DomainName) -> Result<BTreeSet<IpAddr>, DomainError> {
        Ok(BTreeSet::new())
    }

    fn expire_sweep(&self, _now: DateTime<Utc>) -> SweepOutcome {
        self.sweep_calls.fetch_add(1, Ordering::Relaxed);
        self.sweep_results.lock().unwrap().pop().unwrap_or_default()
    }

    fn expire_all(&self) -> Vec<DomainName> {
        Vec::new()
    }

    fn snapshot(&self) -> Vec<DomainRecord> {
        self.records.lock().unwrap().clone()
    }

    fn names(&self) -> Vec<DomainName> {
        Vec::new()
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

pub struct MockPersistence {
    saved: Mutex<Vec<Vec<DomainRecord>>>,
    should_fail: AtomicBool,
    epoch: AtomicI64,
}

impl MockPersistence {
    pub fn new() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            epoch: AtomicI64::new(0),
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<Vec<DomainRecord>> {
        self.saved.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MappingPersistencePort for MockPersistence {
    async fn load(&self) -> Result<Vec<DomainRecord>, DomainError> {
        Ok(Vec::new())
    }

    async fn save(&self, records: &[DomainRecord]) -> Result<(), DomainError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::IoError("disk full".to_string()));
        }
        self.saved.lock().unwrap().push(records.to_vec());
        Ok(())
    }

    fn epoch(&self) -> i64 {
        self.epoch.load(Ordering::Relaxed)
    }

    fn set_epoch(&self, epoch: i64) {
        self.epoch.store(epoch, Ordering::Relaxed);
    }
}

/// Records the names it was asked to re-project.
pub struct MockProjector {
    changed: Arc<Mutex<Vec<DomainName>>>,
}

impl MockProjector {
    pub fn new() -> Self {
        Self {
            changed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn changed(&self) -> Vec<DomainName> {
        self.changed.lock().unwrap().clone()
    }
}

impl MembershipProjectorPort for MockProjector {
    fn register_set(&self, _set_id: SetId, _patterns: Vec<DomainPattern>) -> ProjectionTicket {
        ProjectionTicket::ready()
    }

    fn unregister_set(&self, set_id: &SetId) -> Result<ProjectionTicket, DomainError> {
        Err(DomainError::DomainSetNotFound(set_id.to_string()))
    }

    fn on_names_changed(&self, names: &[DomainName]) -> ProjectionTicket {
        self.changed.lock().unwrap().extend_from_slice(names);
        ProjectionTicket::ready()
    }

    fn members(&self, _set_id: &SetId) -> Option<BTreeSet<IpAddr>> {
        None
    }

    fn set_ids(&self) -> Vec<SetId> {
        Vec::new()
    }
}
