use async_trait::async_trait;
use domainwall_domain::{DomainError, PacketId, QueuedPacket, Verdict};

/// One live binding to a kernel packet queue.
///
/// A session that reported a transport error from `recv` still accepts
/// verdicts for packets it already handed out, until it is dropped.
/// Packets left unanswered at drop get the transport's fallback verdict.
#[async_trait]
pub trait PacketQueueSession: Send {
    /// Cancel safe: dropping the future loses no packet.
    async fn recv(&mut self) -> Result<QueuedPacket, DomainError>;

    async fn set_verdict(&mut self, id: PacketId, verdict: Verdict) -> Result<(), DomainError>;
}

#[async_trait]
pub trait PacketQueueConnector: Send + Sync {
    async fn connect(&self, queue_num: u16) -> Result<Box<dyn PacketQueueSession>, DomainError>;
}
