use async_trait::async_trait;
use domainwall_application::ports::{MembershipView, PacketQueueSession};
use domainwall_domain::config::PacketQueueConfig;
use domainwall_domain::{
    DefaultDisposition, DomainError, PolicyMode, QueuedPacket, ReleaseReason, RetryBudget, Verdict,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::held_packets::{HeldPacketTable, Release};
use super::runner::{deliver, QueueProcessor};
use crate::dns::destination_ip;

const QUEUE_NAME: &str = "denied-packet";

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Holds packets policy would deny until their destination joins a domain
/// set or the retry budget runs out.
pub struct DeniedPacketProcessor {
    view: Arc<dyn MembershipView>,
    mode: watch::Receiver<PolicyMode>,
    budget: RetryBudget,
    max_held: usize,
    do_not_repeat_mark: u32,
    hold_check_interval: Duration,
    disposition: DefaultDisposition,
}

impl DeniedPacketProcessor {
    pub fn new(
        view: Arc<dyn MembershipView>,
        mode: watch::Receiver<PolicyMode>,
        config: &PacketQueueConfig,
    ) -> Self {
        Self {
            view,
            mode,
            budget: config.retry_budget(),
            max_held: config.max_held_packets,
            do_not_repeat_mark: config.do_not_repeat_mark,
            hold_check_interval: config.hold_check_interval(),
            disposition: config.default_disposition,
        }
    }

    fn admit(
        &self,
        table: &mut HeldPacketTable,
        packet: QueuedPacket,
        mode: PolicyMode,
    ) -> Option<Release> {
        let reject = Release {
            id: packet.id,
            verdict: Verdict::Drop,
            reason: ReleaseReason::Rejected,
        };
        if packet.mark & self.do_not_repeat_mark != 0 || packet.payload.is_empty() {
            return Some(reject);
        }
        let destination = match destination_ip(&packet.payload) {
            Ok(ip) => ip,
            Err(e) => {
                debug!(packet = %packet.id, error = %e, "Dropping undecodable denied packet");
                return Some(reject);
            }
        };

        if mode != PolicyMode::DelayDeniedPacket {
            return Some(Release {
                id: packet.id,
                verdict: Verdict::Repeat {
                    mark: packet.mark | self.do_not_repeat_mark,
                },
                reason: ReleaseReason::NotDelayed,
            });
        }

        let release = table.admit(
            packet.id,
            destination,
            packet.mark,
            self.view.contains(&destination),
            now(),
        );
        if release.is_none() {
            debug!(
                packet = %packet.id,
                destination = %destination,
                held = table.len(),
                "Holding denied packet"
            );
        }
        release
    }

    async fn abandon(
        &self,
        session: &mut dyn PacketQueueSession,
        table: &mut HeldPacketTable,
        error: &DomainError,
    ) {
        let releases = table.abandon(self.disposition);
        warn!(
            held = releases.len(),
            disposition = ?self.disposition,
            error = %error,
            "Releasing held packets after queue failure"
        );
        if let Err(e) = deliver(session, QUEUE_NAME, releases).await {
            debug!(error = %e, "Could not deliver fallback verdicts");
        }
    }
}

#[async_trait]
impl QueueProcessor for DeniedPacketProcessor {
    fn name(&self) -> &'static str {
        QUEUE_NAME
    }

    async fn serve(
        &self,
        session: &mut dyn PacketQueueSession,
        shutdown: CancellationToken,
    ) -> Result<(), DomainError> {
        let mut table = HeldPacketTable::new(self.budget, self.max_held, self.do_not_repeat_mark);
        // Subscribe before the first membership check so no addition is missed.
        let mut added = self.view.subscribe();
        let mut added_open = true;
        let mut mode = self.mode.clone();
        mode.mark_unchanged();
        let mut mode_open = true;
        let mut ticker = tokio::time::interval(self.hold_check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let releases = tokio::select! {
                _ = shutdown.cancelled() => {
                    let releases = table.drain();
                    info!(released = releases.len(), "Draining held denied packets");
                    return deliver(session, QUEUE_NAME, releases).await;
                }
                received = session.recv() => match received {
                    Ok(packet) => {
                        let current = *mode.borrow();
                        self.admit(&mut table, packet, current).into_iter().collect()
                    }
                    Err(e) => {
                        self.abandon(session, &mut table, &e).await;
                        return Err(e);
                    }
                },
                ip = added.recv(), if added_open => match ip {
                    Ok(ip) => table.on_member_added(ip, now()),
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "Membership notifications lagged; reconciling held packets");
                        table.reconcile(self.view.as_ref(), now())
                    }
                    Err(RecvError::Closed) => {
                        added_open = false;
                        Vec::new()
                    }
                },
                _ = ticker.tick(), if !table.is_empty() => {
                    table.on_tick(self.view.as_ref(), now())
                }
                changed = mode.changed(), if mode_open => match changed {
                    Ok(()) => {
                        let current = *mode.borrow_and_update();
                        if current == PolicyMode::DelayDeniedPacket {
                            Vec::new()
                        } else {
                            let releases = table.drain();
                            info!(mode = %current, released = releases.len(), "Mode changed; draining held denied packets");
                            releases
                        }
                    }
                    Err(_) => {
                        mode_open = false;
                        Vec::new()
                    }
                },
            };

            if let Err(e) = deliver(session, QUEUE_NAME, releases).await {
                self.abandon(session, &mut table, &e).await;
                return Err(e);
            }
        }
    }
}
