use async_trait::async_trait;
use domainwall_application::ports::PacketQueueSession;
use domainwall_application::use_cases::HandleDnsResponseUseCase;
use domainwall_domain::config::PacketQueueConfig;
use domainwall_domain::{
    DefaultDisposition, DnsObservation, DomainError, PacketId, PolicyMode, QueuedPacket, Verdict,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::runner::QueueProcessor;
use crate::dns::dissect;

const QUEUE_NAME: &str = "dns-response";

/// Snoops DNS responses on their way to local workloads. In
/// DelayDNSResponse mode a response is held until its answers are
/// programmed into the dataplane, or until the hold timeout.
pub struct DnsResponseProcessor {
    use_case: Arc<HandleDnsResponseUseCase>,
    mode: watch::Receiver<PolicyMode>,
    hold_timeout: Duration,
    max_held: usize,
    disposition: DefaultDisposition,
}

impl DnsResponseProcessor {
    pub fn new(
        use_case: Arc<HandleDnsResponseUseCase>,
        mode: watch::Receiver<PolicyMode>,
        config: &PacketQueueConfig,
    ) -> Self {
        Self {
            use_case,
            mode,
            hold_timeout: config.dns_hold_timeout(),
            max_held: config.max_held_packets,
            disposition: config.default_disposition,
        }
    }

    async fn on_packet(
        &self,
        session: &mut dyn PacketQueueSession,
        held: &mut FxHashMap<PacketId, u32>,
        release: &mpsc::UnboundedSender<PacketId>,
        packet: QueuedPacket,
        mode: PolicyMode,
    ) -> Result<(), DomainError> {
        let accept = Verdict::Accept { mark: packet.mark };
        let observation = match dissect(&packet.payload) {
            Ok(dissected) => dissected.into_observation(),
            Err(e) => {
                debug!(packet = %packet.id, error = %e, "Passing through undecodable DNS packet");
                return session.set_verdict(packet.id, accept).await;
            }
        };

        let hold = mode == PolicyMode::DelayDnsResponse && held.len() < self.max_held;
        if !hold {
            if mode == PolicyMode::DelayDnsResponse {
                debug!(packet = %packet.id, held = held.len(), "Hold table full; passing DNS response");
            }
            session.set_verdict(packet.id, accept).await?;
            tokio::spawn(ingest(self.use_case.clone(), observation, false));
            return Ok(());
        }

        held.insert(packet.id, packet.mark);
        let use_case = self.use_case.clone();
        let release = release.clone();
        let hold_timeout = self.hold_timeout;
        let id = packet.id;
        tokio::spawn(async move {
            let pipeline = ingest(use_case, observation, true);
            tokio::pin!(pipeline);
            tokio::select! {
                _ = &mut pipeline => {
                    let _ = release.send(id);
                }
                _ = tokio::time::sleep(hold_timeout) => {
                    debug!(packet = %id, "DNS response hold timed out");
                    let _ = release.send(id);
                    // Programming continues after the response is released.
                    pipeline.await;
                }
            }
        });
        Ok(())
    }

    async fn release_all(
        &self,
        session: &mut dyn PacketQueueSession,
        held: &mut FxHashMap<PacketId, u32>,
        verdict: impl Fn(u32) -> Verdict,
    ) -> Result<(), DomainError> {
        for (id, mark) in held.drain() {
            session.set_verdict(id, verdict(mark)).await?;
        }
        Ok(())
    }

    async fn abandon(
        &self,
        session: &mut dyn PacketQueueSession,
        held: &mut FxHashMap<PacketId, u32>,
        error: &DomainError,
    ) {
        warn!(
            held = held.len(),
            disposition = ?self.disposition,
            error = %error,
            "Releasing held DNS responses after queue failure"
        );
        let disposition = self.disposition;
        if let Err(e) = self
            .release_all(session, held, |mark| disposition.verdict(mark))
            .await
        {
            debug!(error = %e, "Could not deliver fallback verdicts");
        }
        held.clear();
    }
}

/// Runs the ingest and projection pipeline, optionally until the backend
/// acknowledged the resulting membership changes.
async fn ingest(
    use_case: Arc<HandleDnsResponseUseCase>,
    observation: DnsObservation,
    wait_for_backend: bool,
) {
    match use_case.execute(&observation).await {
        Ok(outcome) => {
            if wait_for_backend && outcome.ticket.has_pending_deltas() {
                outcome.ticket.applied().await;
            }
        }
        Err(e) => debug!(error = %e, "Ignoring undecodable DNS response"),
    }
}

#[async_trait]
impl QueueProcessor for DnsResponseProcessor {
    fn name(&self) -> &'static str {
        QUEUE_NAME
    }

    async fn serve(
        &self,
        session: &mut dyn PacketQueueSession,
        shutdown: CancellationToken,
    ) -> Result<(), DomainError> {
        let mut held: FxHashMap<PacketId, u32> = FxHashMap::default();
        let (release_tx, mut release_rx) = mpsc::unbounded_channel();
        let mut mode = self.mode.clone();
        mode.mark_unchanged();
        let mut mode_open = true;

        loop {
            let step = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(released = held.len(), "Draining held DNS responses");
                    return self
                        .release_all(session, &mut held, |mark| Verdict::Accept { mark })
                        .await;
                }
                received = session.recv() => match received {
                    Ok(packet) => {
                        let current = *mode.borrow();
                        self.on_packet(session, &mut held, &release_tx, packet, current).await
                    }
                    Err(e) => {
                        self.abandon(session, &mut held, &e).await;
                        return Err(e);
                    }
                },
                Some(id) = release_rx.recv() => match held.remove(&id) {
                    Some(mark) => {
                        debug!(packet = %id, "Releasing held DNS response");
                        session.set_verdict(id, Verdict::Accept { mark }).await
                    }
                    None => Ok(()),
                },
                changed = mode.changed(), if mode_open => match changed {
                    Ok(()) => {
                        let current = *mode.borrow_and_update();
                        if current == PolicyMode::DelayDnsResponse || held.is_empty() {
                            Ok(())
                        } else {
                            info!(mode = %current, released = held.len(), "Mode changed; releasing held DNS responses");
                            self.release_all(session, &mut held, |mark| Verdict::Accept { mark }).await
                        }
                    }
                    Err(_) => {
                        mode_open = false;
                        Ok(())
                    }
                },
            };

            if let Err(e) = step {
                self.abandon(session, &mut held, &e).await;
                return Err(e);
            }
        }
    }
}
