use dashmap::{DashMap, DashSet};
use domainwall_application::ports::{MembershipBackend, MembershipView, ProjectionTicket};
use domainwall_domain::{DeltaOp, MembershipDelta, SetId};
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;

const ADDED_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_RETRY_INITIAL: Duration = Duration::from_millis(500);
const DEFAULT_RETRY_MAX: Duration = Duration::from_secs(30);

type MemberKey = (SetId, IpAddr);

struct PushBatch {
    deltas: Vec<MembershipDelta>,
    applied: oneshot::Sender<()>,
}

/// Sending half handed to the projector. Batches are applied in order.
#[derive(Clone)]
pub struct MembershipPusher {
    sender: mpsc::UnboundedSender<PushBatch>,
}

impl MembershipPusher {
    pub fn push(&self, deltas: Vec<MembershipDelta>) -> ProjectionTicket {
        if deltas.is_empty() {
            return ProjectionTicket::ready();
        }
        let count = deltas.len();
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(PushBatch {
                deltas,
                applied: tx,
            })
            .is_err()
        {
            debug!(deltas = count, "Push worker gone; dropping membership batch");
        }
        ProjectionTicket::pending(rx, count)
    }
}

impl std::fmt::Debug for MembershipPusher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipPusher")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Union of all sets as acknowledged by the backend.
pub struct AppliedMembership {
    pairs: DashSet<MemberKey>,
    counts: DashMap<IpAddr, u32>,
    added: broadcast::Sender<IpAddr>,
}

impl AppliedMembership {
    fn new() -> Self {
        let (added, _) = broadcast::channel(ADDED_CHANNEL_CAPACITY);
        Self {
            pairs: DashSet::new(),
            counts: DashMap::new(),
            added,
        }
    }

    fn apply(&self, delta: &MembershipDelta) {
        let key = (delta.set_id.clone(), delta.ip);
        match delta.op {
            DeltaOp::Add => {
                if !self.pairs.insert(key) {
                    return;
                }
                let mut count = self.counts.entry(delta.ip).or_insert(0);
                *count += 1;
                if *count == 1 {
                    drop(count);
                    let _ = self.added.send(delta.ip);
                }
            }
            DeltaOp::Remove => {
                if self.pairs.remove(&key).is_none() {
                    return;
                }
                self.counts.remove_if_mut(&delta.ip, |_, count| {
                    *count = count.saturating_sub(1);
                    *count == 0
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl MembershipView for AppliedMembership {
    fn contains(&self, ip: &IpAddr) -> bool {
        self.counts.contains_key(ip)
    }

    fn subscribe(&self) -> broadcast::Receiver<IpAddr> {
        self.added.subscribe()
    }
}

/// Applies projection batches to the firewall backend.
///
/// A ticket resolves once every delta of its batch has been attempted.
/// Failed deltas are retried with backoff until the backend accepts them
/// or a newer delta for the same member replaces them.
pub struct MembershipPushWorker {
    backend: Arc<dyn MembershipBackend>,
    receiver: mpsc::UnboundedReceiver<PushBatch>,
    applied: Arc<AppliedMembership>,
    failed: FxHashMap<MemberKey, DeltaOp>,
    backoff: Backoff,
    retry_at: Option<Instant>,
}

impl MembershipPushWorker {
    pub fn new(
        backend: Arc<dyn MembershipBackend>,
    ) -> (Self, MembershipPusher, Arc<AppliedMembership>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let applied = Arc::new(AppliedMembership::new());
        let worker = Self {
            backend,
            receiver,
            applied: applied.clone(),
            failed: FxHashMap::default(),
            backoff: Backoff::new(DEFAULT_RETRY_INITIAL, DEFAULT_RETRY_MAX),
            retry_at: None,
        };
        (worker, MembershipPusher { sender }, applied)
    }

    pub fn with_retry_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff = Backoff::new(initial, max.max(initial));
        self
    }

    /// Members whose last update has not reached the backend yet.
    pub fn pending_retries(&self) -> usize {
        self.failed.len()
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Starting membership push worker");
        loop {
            let retry_at = self.retry_at;
            tokio::select! {
                _ = shutdown.cancelled() => break,
                batch = self.receiver.recv() => match batch {
                    Some(batch) => self.apply(batch).await,
                    None => break,
                },
                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    self.retry_failed().await;
                }
            }
        }
        // Drain batches queued before shutdown.
        while let Ok(batch) = self.receiver.try_recv() {
            self.apply(batch).await;
        }
        if !self.failed.is_empty() {
            self.retry_failed().await;
        }
        if !self.failed.is_empty() {
            warn!(
                pending = self.failed.len(),
                "Membership updates still unapplied at shutdown"
            );
        }
        info!("Membership push worker stopped");
    }

    async fn apply(&mut self, batch: PushBatch) {
        let mut failed = 0usize;
        for delta in &batch.deltas {
            self.failed.remove(&(delta.set_id.clone(), delta.ip));
            if !self.send(delta).await {
                failed += 1;
                self.schedule_retry(delta);
            }
        }
        debug!(
            deltas = batch.deltas.len(),
            failed,
            "Membership batch applied"
        );
        let _ = batch.applied.send(());
    }

    async fn send(&self, delta: &MembershipDelta) -> bool {
        let result = match delta.op {
            DeltaOp::Add => self.backend.add_member(&delta.set_id, delta.ip).await,
            DeltaOp::Remove => self.backend.remove_member(&delta.set_id, delta.ip).await,
        };
        match result {
            Ok(()) => {
                self.applied.apply(delta);
                true
            }
            Err(e) => {
                warn!(
                    set_id = %delta.set_id,
                    ip = %delta.ip,
                    op = ?delta.op,
                    error = %e,
                    "Membership backend update failed"
                );
                false
            }
        }
    }

    fn schedule_retry(&mut self, delta: &MembershipDelta) {
        self.failed
            .insert((delta.set_id.clone(), delta.ip), delta.op);
        if self.retry_at.is_none() {
            self.retry_at = Some(Instant::now() + self.backoff.next_delay());
        }
    }

    async fn retry_failed(&mut self) {
        let pending = std::mem::take(&mut self.failed);
        let total = pending.len();
        for ((set_id, ip), op) in pending {
            let delta = MembershipDelta { set_id, ip, op };
            if !self.send(&delta).await {
                self.failed.insert((delta.set_id, delta.ip), delta.op);
            }
        }

        if self.failed.is_empty() {
            self.backoff.reset();
            self.retry_at = None;
            info!(retried = total, "Membership backend caught up");
        } else {
            let delay = self.backoff.next_delay();
            self.retry_at = Some(Instant::now() + delay);
            debug!(
                pending = self.failed.len(),
                retry_in_ms = delay.as_millis() as u64,
                "Membership retries still failing"
            );
        }
    }
}
