use domainwall_application::ports::{MappingStorePort, MembershipProjectorPort, ProjectionTicket};
use domainwall_domain::{DomainError, DomainName, DomainPattern, MembershipDelta, SetId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

use super::pattern_index::PatternIndex;
use super::push::MembershipPusher;

#[derive(Default)]
struct SetState {
    patterns: Vec<DomainPattern>,
    /// Matching name -> addresses it currently resolves to.
    contributions: FxHashMap<DomainName, BTreeSet<IpAddr>>,
    /// Address -> number of contributing names.
    refcounts: FxHashMap<IpAddr, u32>,
}

impl SetState {
    fn matches(&self, name: &DomainName) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    fn members(&self) -> BTreeSet<IpAddr> {
        self.refcounts.keys().copied().collect()
    }

    /// Replaces the contribution of `name`, emitting deltas for addresses
    /// entering or leaving the set.
    fn update(
        &mut self,
        set_id: &SetId,
        name: &DomainName,
        ips: BTreeSet<IpAddr>,
        deltas: &mut Vec<MembershipDelta>,
    ) {
        let old = if ips.is_empty() {
            self.contributions.remove(name).unwrap_or_default()
        } else {
            self.contributions
                .insert(name.clone(), ips.clone())
                .unwrap_or_default()
        };

        for ip in old.difference(&ips) {
            if let Some(count) = self.refcounts.get_mut(ip) {
                *count -= 1;
                if *count == 0 {
                    self.refcounts.remove(ip);
                    deltas.push(MembershipDelta::remove(set_id.clone(), *ip));
                }
            }
        }
        for ip in ips.difference(&old) {
            let count = self.refcounts.entry(*ip).or_insert(0);
            *count += 1;
            if *count == 1 {
                deltas.push(MembershipDelta::add(set_id.clone(), *ip));
            }
        }
    }
}

#[derive(Default)]
struct Inner {
    sets: FxHashMap<SetId, SetState>,
    index: PatternIndex,
}

/// Keeps each registered domain set's IP membership in step with the
/// mapping store and hands minimal deltas to the push worker.
pub struct DomainSetProjector {
    store: Arc<dyn MappingStorePort>,
    inner: Mutex<Inner>,
    pusher: MembershipPusher,
}

impl DomainSetProjector {
    pub fn new(store: Arc<dyn MappingStorePort>, pusher: MembershipPusher) -> Self {
        Self {
            store,
            inner: Mutex::new(Inner::default()),
            pusher,
        }
    }

    fn resolve(&self, name: &DomainName) -> BTreeSet<IpAddr> {
        match self.store.lookup_ips(name) {
            Ok(ips) => ips,
            Err(e) => {
                debug!(domain = %name, error = %e, "Treating unresolvable name as empty");
                BTreeSet::new()
            }
        }
    }

    /// Names currently in the store matched by any of `patterns`.
    fn matching_names(&self, patterns: &[DomainPattern]) -> FxHashSet<DomainName> {
        let mut names: FxHashSet<DomainName> = patterns
            .iter()
            .filter_map(|p| match p {
                DomainPattern::Exact(name) => Some(name.clone()),
                _ => None,
            })
            .collect();

        if patterns.iter().any(DomainPattern::is_wildcard) {
            names.extend(
                self.store
                    .names()
                    .into_iter()
                    .filter(|name| patterns.iter().any(|p| p.matches(name))),
            );
        }
        names
    }
}

impl MembershipProjectorPort for DomainSetProjector {
    #[instrument(skip(self, patterns), fields(set_id = %set_id))]
    fn register_set(&self, set_id: SetId, patterns: Vec<DomainPattern>) -> ProjectionTicket {
        // Held across resolution so a concurrent store change cannot be
        // projected against the previous patterns in between.
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let candidates = self.matching_names(&patterns);
        let resolved: Vec<(DomainName, BTreeSet<IpAddr>)> = candidates
            .into_iter()
            .map(|name| {
                let ips = self.resolve(&name);
                (name, ips)
            })
            .collect();

        let Inner { sets, index } = &mut *inner;

        let previous = sets.remove(&set_id).unwrap_or_default();
        for pattern in &previous.patterns {
            index.remove(pattern, &set_id);
        }
        for pattern in &patterns {
            index.insert(pattern, &set_id);
        }

        let mut state = SetState {
            patterns,
            ..SetState::default()
        };
        let mut ignored = Vec::new();
        for (name, ips) in resolved {
            state.update(&set_id, &name, ips, &mut ignored);
        }

        let old_members = previous.members();
        let new_members = state.members();
        let deltas: Vec<MembershipDelta> = old_members
            .difference(&new_members)
            .map(|ip| MembershipDelta::remove(set_id.clone(), *ip))
            .chain(
                new_members
                    .difference(&old_members)
                    .map(|ip| MembershipDelta::add(set_id.clone(), *ip)),
            )
            .collect();

        debug!(
            members = new_members.len(),
            deltas = deltas.len(),
            "Domain set projected"
        );
        sets.insert(set_id, state);
        self.pusher.push(deltas)
    }

    fn unregister_set(&self, set_id: &SetId) -> Result<ProjectionTicket, DomainError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let state = inner
            .sets
            .remove(set_id)
            .ok_or_else(|| DomainError::DomainSetNotFound(set_id.to_string()))?;
        for pattern in &state.patterns {
            inner.index.remove(pattern, set_id);
        }

        let deltas = state
            .members()
            .into_iter()
            .map(|ip| MembershipDelta::remove(set_id.clone(), ip))
            .collect();
        Ok(self.pusher.push(deltas))
    }

    fn on_names_changed(&self, names: &[DomainName]) -> ProjectionTicket {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut deltas = Vec::new();

        for name in names {
            let candidates = inner.index.candidates(name);
            if candidates.is_empty() {
                continue;
            }
            let ips = self.resolve(name);
            for set_id in candidates {
                if let Some(state) = inner.sets.get_mut(&set_id) {
                    if state.matches(name) {
                        state.update(&set_id, name, ips.clone(), &mut deltas);
                    }
                }
            }
        }

        if !deltas.is_empty() {
            debug!(names = names.len(), deltas = deltas.len(), "Membership deltas computed");
        }
        self.pusher.push(deltas)
    }

    fn members(&self, set_id: &SetId) -> Option<BTreeSet<IpAddr>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.sets.get(set_id).map(SetState::members)
    }

    fn set_ids(&self) -> Vec<SetId> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<SetId> = inner.sets.keys().cloned().collect();
        ids.sort();
        ids
    }
}
