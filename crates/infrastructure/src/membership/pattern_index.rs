use compact_str::CompactString;
use domainwall_domain::{DomainName, DomainPattern, SetId};
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Default)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    /// Sets with a wildcard anchored exactly at this node.
    sets: SmallVec<[SetId; 2]>,
    /// Infix patterns anchored here; the other side is checked on lookup.
    infix: SmallVec<[(DomainPattern, SetId); 1]>,
}

impl TrieNode {
    fn descend<'a, I>(&mut self, labels: I) -> &mut TrieNode
    where
        I: Iterator<Item = &'a str>,
    {
        let mut node = self;
        for label in labels {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        node
    }

    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.sets.is_empty() && self.infix.is_empty()
    }

    /// Applies `edit` to the node at `labels`, then drops nodes left empty
    /// on the way back up.
    fn edit_and_prune<F>(&mut self, labels: &[&str], edit: F)
    where
        F: FnOnce(&mut TrieNode),
    {
        match labels.split_first() {
            None => edit(self),
            Some((label, rest)) => {
                if let Some(child) = self.children.get_mut(*label) {
                    child.edit_and_prune(rest, edit);
                    if child.is_empty() {
                        self.children.remove(*label);
                    }
                }
            }
        }
    }

    /// Collects sets anchored on strict ancestors of the walked path: a
    /// wildcard must cover at least one more label.
    fn collect<'a>(&self, labels: &[&'a str], name: &DomainName, out: &mut FxHashSet<SetId>) {
        let n = labels.len();
        let mut node = self;
        for (i, label) in labels.iter().enumerate() {
            match node.children.get(*label) {
                Some(child) => {
                    if i + 1 < n {
                        out.extend(child.sets.iter().cloned());
                        out.extend(
                            child
                                .infix
                                .iter()
                                .filter(|(pattern, _)| pattern.matches(name))
                                .map(|(_, set_id)| set_id.clone()),
                        );
                    }
                    node = child;
                }
                None => break,
            }
        }
    }
}

/// Maps a changed name to the sets whose patterns can match it, without
/// scanning every registered pattern.
#[derive(Default)]
pub struct PatternIndex {
    exact: FxHashMap<DomainName, SmallVec<[SetId; 2]>>,
    /// `*.suffix` and infix patterns, keyed by reversed labels.
    suffixes: TrieNode,
    /// `prefix.*` patterns, keyed by labels in order.
    prefixes: TrieNode,
}

impl PatternIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: &DomainPattern, set_id: &SetId) {
        match pattern {
            DomainPattern::Exact(name) => {
                let sets = self.exact.entry(name.clone()).or_default();
                if !sets.contains(set_id) {
                    sets.push(set_id.clone());
                }
            }
            DomainPattern::Suffix(suffix) => {
                let node = self.suffixes.descend(suffix.labels().rev());
                if !node.sets.contains(set_id) {
                    node.sets.push(set_id.clone());
                }
            }
            DomainPattern::Prefix(prefix) => {
                let node = self.prefixes.descend(prefix.labels());
                if !node.sets.contains(set_id) {
                    node.sets.push(set_id.clone());
                }
            }
            DomainPattern::Infix { suffix, .. } => {
                let node = self.suffixes.descend(suffix.labels().rev());
                node.infix.push((pattern.clone(), set_id.clone()));
            }
        }
    }

    pub fn remove(&mut self, pattern: &DomainPattern, set_id: &SetId) {
        match pattern {
            DomainPattern::Exact(name) => {
                if let Some(sets) = self.exact.get_mut(name) {
                    sets.retain(|s| s != set_id);
                    if sets.is_empty() {
                        self.exact.remove(name);
                    }
                }
            }
            DomainPattern::Suffix(suffix) => {
                let labels: SmallVec<[&str; 8]> = suffix.labels().rev().collect();
                self.suffixes
                    .edit_and_prune(&labels, |node| node.sets.retain(|s| s != set_id));
            }
            DomainPattern::Prefix(prefix) => {
                let labels: SmallVec<[&str; 8]> = prefix.labels().collect();
                self.prefixes
                    .edit_and_prune(&labels, |node| node.sets.retain(|s| s != set_id));
            }
            DomainPattern::Infix { suffix, .. } => {
                let labels: SmallVec<[&str; 8]> = suffix.labels().rev().collect();
                self.suffixes.edit_and_prune(&labels, |node| {
                    node.infix.retain(|(p, s)| !(p == pattern && s == set_id))
                });
            }
        }
    }

    /// Sets with at least one pattern matching `name`.
    pub fn candidates(&self, name: &DomainName) -> FxHashSet<SetId> {
        let mut out = FxHashSet::default();
        if let Some(sets) = self.exact.get(name) {
            out.extend(sets.iter().cloned());
        }

        let forward: SmallVec<[&str; 8]> = name.labels().collect();
        let reversed: SmallVec<[&str; 8]> = forward.iter().rev().copied().collect();
        self.suffixes.collect(&reversed, name, &mut out);
        self.prefixes.collect(&forward, name, &mut out);
        out
    }
}
