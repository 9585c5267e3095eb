#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use domainwall_application::ports::{
    Clock, ConntrackEntry, ConntrackLookup, DnsMessageDecoder, MappingPersistencePort,
    MappingStorePort, MembershipProjectorPort, ProjectionTicket, StoreMutation, SweepOutcome,
};
use domainwall_domain::{
    DnsAnswer, DnsFlow, DomainError, DomainName, DomainPattern, DomainRecord, MappingValue,
    ParsedDnsResponse, SetId, TransportProtocol,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn name(raw: &str) -> DomainName {
    DomainName::new(raw).unwrap()
}

pub fn a_answer(domain: &str, ip: &str, ttl: u32) -> DnsAnswer {
    DnsAnswer {
        name: name(domain),
        value: MappingValue::Ip(ip.parse().unwrap()),
        ttl,
    }
}

pub fn udp_flow(client: &str, server: &str) -> DnsFlow {
    DnsFlow {
        client: client.parse().unwrap(),
        server: server.parse().unwrap(),
        protocol: TransportProtocol::Udp,
    }
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

// ── Decoder ─────────────────────────────────────────────────────────────────

pub struct MockDecoder {
    response: RwLock<Result<ParsedDnsResponse, DomainError>>,
    call_count: AtomicU64,
}

impl MockDecoder {
    pub fn returning(answers: Vec<DnsAnswer>) -> Self {
        Self {
            response: RwLock::new(Ok(ParsedDnsResponse {
                id: 1,
                question_name: answers.first().map(|a| a.name.clone()),
                answers,
            })),
            call_count: AtomicU64::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: RwLock::new(Err(DomainError::InvalidDnsMessage(
                "truncated".to_string(),
            ))),
            call_count: AtomicU64::new(0),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl DnsMessageDecoder for MockDecoder {
    fn decode(
        &self,
        _payload: &[u8],
        _protocol: TransportProtocol,
    ) -> Result<ParsedDnsResponse, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.response.read().unwrap().clone()
    }
}

// ── Conntrack ───────────────────────────────────────────────────────────────

pub struct MockConntrack {
    entries: RwLock<Vec<ConntrackEntry>>,
    should_fail: RwLock<bool>,
    call_count: AtomicU64,
}

impl MockConntrack {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            should_fail: RwLock::new(false),
            call_count: AtomicU64::new(0),
        }
    }

    /// A request from `client` to `server` that was not translated.
    pub fn with_request(client: &str, server: &str) -> Self {
        let mock = Self::new();
        mock.add_request(client, server, server);
        mock
    }

    pub fn add_request(&self, client: &str, original_dst: &str, reply_src: &str) {
        let client: SocketAddr = client.parse().unwrap();
        self.entries.write().unwrap().push(ConntrackEntry {
            protocol: TransportProtocol::Udp,
            original_src: client,
            original_dst: original_dst.parse().unwrap(),
            reply_src: reply_src.parse().unwrap(),
            reply_dst: client,
        });
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().unwrap() = fail;
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConntrackLookup for MockConntrack {
    async fn find_request(&self, response: &DnsFlow) -> Result<Option<ConntrackEntry>, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if *self.should_fail.read().unwrap() {
            return Err(DomainError::Conntrack("conntrack unavailable".to_string()));
        }
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.matches_response(response))
            .copied())
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Flat A-record store; enough to observe what the use cases feed it.
pub struct MockStore {
    records: RwLock<BTreeMap<(DomainName, MappingValue), DateTime<Utc>>>,
    ingest_calls: AtomicU64,
    expire_all_calls: AtomicU64,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            ingest_calls: AtomicU64::new(0),
            expire_all_calls: AtomicU64::new(0),
        }
    }

    pub fn with_records(records: Vec<DomainRecord>) -> Self {
        let store = Self::new();
        store.restore(records);
        store
    }

    pub fn ingest_calls(&self) -> u64 {
        self.ingest_calls.load(Ordering::Relaxed)
    }

    pub fn expire_all_calls(&self) -> u64 {
        self.expire_all_calls.load(Ordering::Relaxed)
    }

    pub fn lookup_ips_for(&self, domain: &str) -> Vec<IpAddr> {
        self.lookup_ips(&name(domain))
            .unwrap()
            .into_iter()
            .collect()
    }

    pub fn is_empty_store(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }
}

impl MappingStorePort for MockStore {
    fn ingest(&self, answers: &[DnsAnswer], observed_at: DateTime<Utc>) -> StoreMutation {
        self.ingest_calls.fetch_add(1, Ordering::Relaxed);
        let mut records = self.records.write().unwrap();
        let mut changed = BTreeSet::new();
        for answer in answers {
            let expiry = observed_at + Duration::seconds(answer.ttl as i64);
            if records
                .insert((answer.name.clone(), answer.value.clone()), expiry)
                .is_none()
            {
                changed.insert(answer.name.clone());
            }
        }
        StoreMutation {
            changed: changed.into_iter().collect(),
            ignored: 0,
        }
    }

    fn restore(&self, records: Vec<DomainRecord>) -> StoreMutation {
        let mut map = self.records.write().unwrap();
        let mut changed = BTreeSet::new();
        for record in records {
            changed.insert(record.domain.clone());
            map.insert((record.domain, record.value), record.expiry);
        }
        StoreMutation {
            changed: changed.into_iter().collect(),
            ignored: 0,
        }
    }

    fn lookup_ips(&self, domain: &DomainName) -> Result<BTreeSet<IpAddr>, DomainError> {
        Ok(self
            .records
            .read()
            .unwrap()
            .keys()
            .filter(|(d, _)| d == domain)
            .filter_map(|(_, v)| v.as_ip())
            .collect())
    }

    fn expire_sweep(&self, now: DateTime<Utc>) -> SweepOutcome {
        let mut records = self.records.write().unwrap();
        let expired: Vec<_> = records
            .iter()
            .filter(|(_, expiry)| **expiry <= now)
            .map(|(k, _)| k.clone())
            .collect();
        let mut changed = BTreeSet::new();
        for key in &expired {
            records.remove(key);
            changed.insert(key.0.clone());
        }
        SweepOutcome {
            changed: changed.into_iter().collect(),
            expired: expired.len(),
            collected: 0,
            remaining: records.len(),
        }
    }

    fn expire_all(&self) -> Vec<DomainName> {
        self.expire_all_calls.fetch_add(1, Ordering::Relaxed);
        let mut records = self.records.write().unwrap();
        let names: BTreeSet<_> = records.keys().map(|(d, _)| d.clone()).collect();
        records.clear();
        names.into_iter().collect()
    }

    fn snapshot(&self) -> Vec<DomainRecord> {
        self.records
            .read()
            .unwrap()
            .iter()
            .map(|((d, v), e)| DomainRecord::new(d.clone(), v.clone(), *e))
            .collect()
    }

    fn names(&self) -> Vec<DomainName> {
        let names: BTreeSet<_> = self
            .records
            .read()
            .unwrap()
            .keys()
            .map(|(d, _)| d.clone())
            .collect();
        names.into_iter().collect()
    }

    fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

// ── Persistence ─────────────────────────────────────────────────────────────

pub struct MockPersistence {
    stored: Mutex<Vec<DomainRecord>>,
    load_error: RwLock<Option<DomainError>>,
    save_count: AtomicU64,
    epoch: AtomicI64,
}

impl MockPersistence {
    pub fn new() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            load_error: RwLock::new(None),
            save_count: AtomicU64::new(0),
            epoch: AtomicI64::new(0),
        }
    }

    pub fn with_records(records: Vec<DomainRecord>) -> Self {
        let mock = Self::new();
        *mock.stored.lock().unwrap() = records;
        mock
    }

    pub fn set_load_error(&self, error: DomainError) {
        *self.load_error.write().unwrap() = Some(error);
    }

    pub fn stored(&self) -> Vec<DomainRecord> {
        self.stored.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> u64 {
        self.save_count.load(Ordering::Relaxed)
    }

    pub fn epoch_value(&self) -> i64 {
        self.epoch.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MappingPersistencePort for MockPersistence {
    async fn load(&self) -> Result<Vec<DomainRecord>, DomainError> {
        if let Some(e) = self.load_error.read().unwrap().clone() {
            return Err(e);
        }
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn save(&self, records: &[DomainRecord]) -> Result<(), DomainError> {
        self.save_count.fetch_add(1, Ordering::Relaxed);
        *self.stored.lock().unwrap() = records.to_vec();
        Ok(())
    }

    fn epoch(&self) -> i64 {
        self.epoch.load(Ordering::Relaxed)
    }

    fn set_epoch(&self, epoch: i64) {
        self.epoch.store(epoch, Ordering::Relaxed);
    }
}

// ── Projector ───────────────────────────────────────────────────────────────

pub struct MockProjector {
    sets: RwLock<HashMap<SetId, Vec<DomainPattern>>>,
    changed_batches: Mutex<Vec<Vec<DomainName>>>,
}

impl MockProjector {
    pub fn new() -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            changed_batches: Mutex::new(Vec::new()),
        }
    }

    pub fn changed_batches(&self) -> Vec<Vec<DomainName>> {
        self.changed_batches.lock().unwrap().clone()
    }

    pub fn set_ids_sorted(&self) -> Vec<SetId> {
        self.set_ids()
    }

    pub fn patterns(&self, set_id: &str) -> Option<Vec<DomainPattern>> {
        self.sets.read().unwrap().get(&SetId::new(set_id)).cloned()
    }
}

impl MembershipProjectorPort for MockProjector {
    fn register_set(&self, set_id: SetId, patterns: Vec<DomainPattern>) -> ProjectionTicket {
        self.sets.write().unwrap().insert(set_id, patterns);
        ProjectionTicket::ready()
    }

    fn unregister_set(&self, set_id: &SetId) -> Result<ProjectionTicket, DomainError> {
        match self.sets.write().unwrap().remove(set_id) {
            Some(_) => Ok(ProjectionTicket::ready()),
            None => Err(DomainError::DomainSetNotFound(set_id.to_string())),
        }
    }

    fn on_names_changed(&self, names: &[DomainName]) -> ProjectionTicket {
        self.changed_batches.lock().unwrap().push(names.to_vec());
        ProjectionTicket::ready()
    }

    fn members(&self, _set_id: &SetId) -> Option<BTreeSet<IpAddr>> {
        None
    }

    fn set_ids(&self) -> Vec<SetId> {
        let mut ids: Vec<SetId> = self.sets.read().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
