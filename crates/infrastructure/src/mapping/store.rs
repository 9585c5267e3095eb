use chrono::{DateTime, Duration, Utc};
use domainwall_application::ports::{Clock, MappingStorePort, StoreMutation, SweepOutcome};
use domainwall_domain::{DnsAnswer, DomainError, DomainName, DomainRecord, MappingValue};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Shortest lifetime granted to any mapping, after the configured extension.
const MIN_TTL_SECS: i64 = 2;

type Values = FxHashMap<MappingValue, DateTime<Utc>>;

#[derive(Default)]
struct Inner {
    names: FxHashMap<DomainName, Values>,
    /// CNAME target -> names aliasing it.
    parents: FxHashMap<DomainName, FxHashSet<DomainName>>,
}

impl Inner {
    /// Inserts or extends one mapping. Returns true when the live value set
    /// of `name` changed.
    fn upsert(
        &mut self,
        name: &DomainName,
        value: &MappingValue,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        let values = self.names.entry(name.clone()).or_default();
        match values.get_mut(value) {
            Some(current) => {
                let was_live = *current > now;
                if expiry > *current {
                    *current = expiry;
                }
                !was_live && *current > now
            }
            None => {
                values.insert(value.clone(), expiry);
                if let MappingValue::Name(target) = value {
                    self.parents
                        .entry(target.clone())
                        .or_default()
                        .insert(name.clone());
                }
                expiry > now
            }
        }
    }

    /// `changed` plus every name that reaches one of them through CNAMEs.
    fn with_ancestors(&self, changed: FxHashSet<DomainName>) -> Vec<DomainName> {
        let mut seen = changed.clone();
        let mut queue: Vec<DomainName> = changed.into_iter().collect();
        while let Some(name) = queue.pop() {
            if let Some(parents) = self.parents.get(&name) {
                for parent in parents {
                    if seen.insert(parent.clone()) {
                        queue.push(parent.clone());
                    }
                }
            }
        }
        let mut names: Vec<_> = seen.into_iter().collect();
        names.sort();
        names
    }

    fn unlink(&mut self, name: &DomainName, target: &DomainName) {
        if let Some(parents) = self.parents.get_mut(target) {
            parents.remove(name);
            if parents.is_empty() {
                self.parents.remove(target);
            }
        }
    }

    fn live_values<'a>(
        &'a self,
        name: &DomainName,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a MappingValue> + 'a {
        self.names
            .get(name)
            .into_iter()
            .flat_map(move |values| {
                values
                    .iter()
                    .filter(move |(_, expiry)| **expiry > now)
                    .map(|(value, _)| value)
            })
    }

    fn cname_targets<'a>(&'a self, name: &DomainName, now: DateTime<Utc>) -> Vec<&'a DomainName> {
        self.live_values(name, now)
            .filter_map(|value| match value {
                MappingValue::Name(target) => Some(target),
                MappingValue::Ip(_) => None,
            })
            .collect()
    }

    fn collect_ips(&self, name: &DomainName, now: DateTime<Utc>, ips: &mut BTreeSet<IpAddr>) {
        ips.extend(self.live_values(name, now).filter_map(MappingValue::as_ip));
    }
}

struct Frame<'a> {
    name: &'a DomainName,
    targets: Vec<&'a DomainName>,
    next: usize,
}

/// In-memory domain to address map with absolute expiries.
///
/// Readers share a lock with writers; every mutation is applied under the
/// write guard, so a lookup never sees a half-applied answer set.
pub struct DomainMappingStore {
    inner: RwLock<Inner>,
    clock: Arc<dyn Clock>,
    extra_ttl: Duration,
    max_depth: usize,
}

impl DomainMappingStore {
    pub fn new(clock: Arc<dyn Clock>, extra_ttl_secs: u32, max_depth: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            clock,
            extra_ttl: Duration::seconds(extra_ttl_secs as i64),
            max_depth,
        }
    }

    fn expiry_for(&self, ttl: u32, observed_at: DateTime<Utc>) -> DateTime<Utc> {
        let lifetime = (Duration::seconds(ttl as i64) + self.extra_ttl)
            .max(Duration::seconds(MIN_TTL_SECS));
        observed_at + lifetime
    }
}

fn is_ignored(value: &MappingValue) -> bool {
    matches!(value, MappingValue::Ip(ip) if ip.is_unspecified())
}

impl MappingStorePort for DomainMappingStore {
    fn ingest(&self, answers: &[DnsAnswer], observed_at: DateTime<Utc>) -> StoreMutation {
        let now = self.clock.now();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut changed = FxHashSet::default();
        let mut ignored = 0;

        for answer in answers {
            if is_ignored(&answer.value) {
                ignored += 1;
                continue;
            }
            let expiry = self.expiry_for(answer.ttl, observed_at);
            if inner.upsert(&answer.name, &answer.value, expiry, now) {
                changed.insert(answer.name.clone());
            }
        }

        StoreMutation {
            changed: inner.with_ancestors(changed),
            ignored,
        }
    }

    fn restore(&self, records: Vec<DomainRecord>) -> StoreMutation {
        let now = self.clock.now();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut changed = FxHashSet::default();
        let mut ignored = 0;

        for record in records {
            if is_ignored(&record.value) {
                ignored += 1;
                continue;
            }
            if inner.upsert(&record.domain, &record.value, record.expiry, now) {
                changed.insert(record.domain);
            }
        }

        StoreMutation {
            changed: inner.with_ancestors(changed),
            ignored,
        }
    }

    fn lookup_ips(&self, domain: &DomainName) -> Result<BTreeSet<IpAddr>, DomainError> {
        let now = self.clock.now();
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut ips = BTreeSet::new();

        inner.collect_ips(domain, now, &mut ips);
        let mut path = vec![Frame {
            name: domain,
            targets: inner.cname_targets(domain, now),
            next: 0,
        }];
        let mut on_path: FxHashSet<&DomainName> = FxHashSet::default();
        on_path.insert(domain);
        let mut done: FxHashSet<&DomainName> = FxHashSet::default();

        while let Some(frame) = path.last_mut() {
            if frame.next == frame.targets.len() {
                on_path.remove(frame.name);
                done.insert(frame.name);
                path.pop();
                continue;
            }
            let target = frame.targets[frame.next];
            frame.next += 1;

            if on_path.contains(target) {
                debug!(domain = %domain, at = %target, "CNAME cycle");
                return Err(DomainError::CnameCycle(domain.to_string()));
            }
            if done.contains(target) {
                continue;
            }
            if path.len() > self.max_depth {
                debug!(domain = %domain, max_depth = self.max_depth, "CNAME chain too deep");
                return Err(DomainError::CnameDepthExceeded {
                    domain: domain.to_string(),
                    max_depth: self.max_depth,
                });
            }

            inner.collect_ips(target, now, &mut ips);
            on_path.insert(target);
            path.push(Frame {
                name: target,
                targets: inner.cname_targets(target, now),
                next: 0,
            });
        }

        Ok(ips)
    }

    fn expire_sweep(&self, now: DateTime<Utc>) -> SweepOutcome {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut changed = FxHashSet::default();
        let mut unlinked = Vec::new();
        let mut expired = 0;

        for (name, values) in inner.names.iter_mut() {
            let before = values.len();
            values.retain(|value, expiry| {
                let live = *expiry > now;
                if !live {
                    if let MappingValue::Name(target) = value {
                        unlinked.push((name.clone(), target.clone()));
                    }
                }
                live
            });
            if values.len() != before {
                expired += before - values.len();
                changed.insert(name.clone());
            }
        }
        for (name, target) in &unlinked {
            inner.unlink(name, target);
        }

        let changed = inner.with_ancestors(changed);

        // Valueless names survive only while something still aliases them.
        let Inner { names, parents } = &mut *inner;
        let before = names.len();
        names.retain(|name, values| !values.is_empty() || parents.contains_key(name));
        let collected = before - names.len();

        let remaining = names.values().map(|v| v.len()).sum();
        SweepOutcome {
            changed,
            expired,
            collected,
            remaining,
        }
    }

    fn expire_all(&self) -> Vec<DomainName> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<_> = std::mem::take(&mut inner.names).into_keys().collect();
        inner.parents.clear();
        names.sort();
        names
    }

    fn snapshot(&self) -> Vec<DomainRecord> {
        let now = self.clock.now();
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut records: Vec<_> = inner
            .names
            .iter()
            .flat_map(|(name, values)| {
                values
                    .iter()
                    .filter(|(_, expiry)| **expiry > now)
                    .map(move |(value, expiry)| {
                        DomainRecord::new(name.clone(), value.clone(), *expiry)
                    })
            })
            .collect();
        records.sort_by(|a, b| (&a.domain, &a.value).cmp(&(&b.domain, &b.value)));
        records
    }

    fn names(&self) -> Vec<DomainName> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.names.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.names.values().map(|v| v.len()).sum()
    }
}
