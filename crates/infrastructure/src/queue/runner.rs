use async_trait::async_trait;
use domainwall_application::ports::{PacketQueueConnector, PacketQueueSession};
use domainwall_domain::config::PacketQueueConfig;
use domainwall_domain::DomainError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::held_packets::Release;
use crate::backoff::Backoff;

/// Decision loop run against one live queue session.
#[async_trait]
pub trait QueueProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `Ok` after draining on shutdown, or the transport error that
    /// ended the session. Packets held at that point must already have
    /// been released.
    async fn serve(
        &self,
        session: &mut dyn PacketQueueSession,
        shutdown: CancellationToken,
    ) -> Result<(), DomainError>;
}

pub(crate) async fn deliver(
    session: &mut dyn PacketQueueSession,
    queue: &'static str,
    releases: Vec<Release>,
) -> Result<(), DomainError> {
    for release in releases {
        debug!(
            queue,
            packet = %release.id,
            verdict = release.verdict.as_str(),
            reason = release.reason.as_str(),
            "Releasing packet"
        );
        session.set_verdict(release.id, release.verdict).await?;
    }
    Ok(())
}

/// Keeps one processor bound to its kernel queue, reconnecting after
/// transport failures until shutdown.
pub struct QueueRunner {
    queue_num: u16,
    connector: Arc<dyn PacketQueueConnector>,
    processor: Arc<dyn QueueProcessor>,
    backoff: Backoff,
    drain_grace: Duration,
    shutdown: CancellationToken,
}

impl QueueRunner {
    pub fn new(
        queue_num: u16,
        connector: Arc<dyn PacketQueueConnector>,
        processor: Arc<dyn QueueProcessor>,
        config: &PacketQueueConfig,
    ) -> Self {
        Self {
            queue_num,
            connector,
            processor,
            backoff: Backoff::new(
                Duration::from_millis(config.reconnect_initial_backoff_ms),
                Duration::from_millis(config.reconnect_max_backoff_ms),
            ),
            drain_grace: config.drain_grace(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn run(mut self) {
        let queue = self.processor.name();
        info!(queue, queue_num = self.queue_num, "Starting packet queue runner");

        loop {
            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                connected = self.connector.connect(self.queue_num) => connected,
            };

            match connected {
                Ok(mut session) => {
                    info!(queue, queue_num = self.queue_num, "Packet queue connected");
                    self.backoff.reset();
                    match self.serve(session.as_mut()).await {
                        Ok(()) => break,
                        Err(e) => warn!(
                            queue,
                            queue_num = self.queue_num,
                            error = %e,
                            "Packet queue session ended; reconnecting"
                        ),
                    }
                }
                Err(e) => warn!(
                    queue,
                    queue_num = self.queue_num,
                    error = %e,
                    "Packet queue connect failed"
                ),
            }

            let delay = self.backoff.next_delay();
            debug!(queue, delay_ms = delay.as_millis() as u64, "Waiting before reconnect");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(queue, queue_num = self.queue_num, "Packet queue runner stopped");
    }

    async fn serve(&self, session: &mut dyn PacketQueueSession) -> Result<(), DomainError> {
        let serve = self.processor.serve(session, self.shutdown.clone());
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => result,
            _ = self.shutdown.cancelled() => {
                match tokio::time::timeout(self.drain_grace, &mut serve).await {
                    Ok(result) => result.or_else(|e| {
                        debug!(error = %e, "Queue failed while draining");
                        Ok(())
                    }),
                    Err(_) => {
                        warn!(
                            queue = self.processor.name(),
                            grace_ms = self.drain_grace.as_millis() as u64,
                            "Drain grace period elapsed"
                        );
                        Ok(())
                    }
                }
            }
        }
    }
}
