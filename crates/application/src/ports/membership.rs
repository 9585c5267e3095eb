use async_trait::async_trait;
use domainwall_domain::{DomainError, DomainName, DomainPattern, SetId};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

/// Firewall backend materializing domain sets as kernel IP sets.
#[async_trait]
pub trait MembershipBackend: Send + Sync {
    async fn add_member(&self, set_id: &SetId, ip: IpAddr) -> Result<(), DomainError>;

    async fn remove_member(&self, set_id: &SetId, ip: IpAddr) -> Result<(), DomainError>;
}

/// Completion handle for one projection batch.
#[derive(Debug)]
pub struct ProjectionTicket {
    applied: Option<oneshot::Receiver<()>>,
    deltas: usize,
}

impl ProjectionTicket {
    /// A batch with nothing to push.
    pub fn ready() -> Self {
        Self {
            applied: None,
            deltas: 0,
        }
    }

    pub fn pending(applied: oneshot::Receiver<()>, deltas: usize) -> Self {
        Self {
            applied: Some(applied),
            deltas,
        }
    }

    pub fn deltas(&self) -> usize {
        self.deltas
    }

    pub fn has_pending_deltas(&self) -> bool {
        self.applied.is_some()
    }

    /// Resolves once the backend has processed the batch. Returns false if
    /// the push worker went away first.
    pub async fn applied(self) -> bool {
        match self.applied {
            Some(rx) => rx.await.is_ok(),
            None => true,
        }
    }

    /// Like [`applied`](Self::applied) but gives up after `timeout`.
    pub async fn wait(self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.applied())
            .await
            .unwrap_or(false)
    }
}

/// Keeps per-set membership in step with the mapping store.
pub trait MembershipProjectorPort: Send + Sync {
    /// Registers or replaces a set; only the membership difference is pushed.
    fn register_set(&self, set_id: SetId, patterns: Vec<DomainPattern>) -> ProjectionTicket;

    fn unregister_set(&self, set_id: &SetId) -> Result<ProjectionTicket, DomainError>;

    /// Re-evaluates only the sets whose patterns match a changed name.
    fn on_names_changed(&self, names: &[DomainName]) -> ProjectionTicket;

    fn members(&self, set_id: &SetId) -> Option<BTreeSet<IpAddr>>;

    fn set_ids(&self) -> Vec<SetId>;
}

/// Membership as already applied by the backend, across all sets.
pub trait MembershipView: Send + Sync {
    fn contains(&self, ip: &IpAddr) -> bool;

    /// Addresses newly applied to at least one set.
    fn subscribe(&self) -> broadcast::Receiver<IpAddr>;
}
