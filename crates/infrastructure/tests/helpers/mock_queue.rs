#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use domainwall_application::ports::{PacketQueueConnector, PacketQueueSession};
use domainwall_domain::{DomainError, PacketId, QueuedPacket, Verdict};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct MockQueueSession {
    packets: mpsc::UnboundedReceiver<Result<QueuedPacket, DomainError>>,
    verdicts: mpsc::UnboundedSender<(PacketId, Verdict)>,
}

#[async_trait]
impl PacketQueueSession for MockQueueSession {
    async fn recv(&mut self) -> Result<QueuedPacket, DomainError> {
        match self.packets.recv().await {
            Some(packet) => packet,
            None => std::future::pending().await,
        }
    }

    async fn set_verdict(&mut self, id: PacketId, verdict: Verdict) -> Result<(), DomainError> {
        self.verdicts
            .send((id, verdict))
            .map_err(|_| DomainError::QueueDisconnected("test queue closed".to_string()))
    }
}

/// Test side of a mock kernel queue.
pub struct MockQueue {
    packets: mpsc::UnboundedSender<Result<QueuedPacket, DomainError>>,
    verdicts: mpsc::UnboundedReceiver<(PacketId, Verdict)>,
    next_id: u64,
}

pub fn mock_queue() -> (MockQueueSession, MockQueue) {
    let (packet_tx, packet_rx) = mpsc::unbounded_channel();
    let (verdict_tx, verdict_rx) = mpsc::unbounded_channel();
    (
        MockQueueSession {
            packets: packet_rx,
            verdicts: verdict_tx,
        },
        MockQueue {
            packets: packet_tx,
            verdicts: verdict_rx,
            next_id: 0,
        },
    )
}

impl MockQueue {
    pub fn inject(&mut self, payload: Vec<u8>, mark: u32) -> PacketId {
        self.next_id += 1;
        let id = PacketId(self.next_id);
        let _ = self
            .packets
            .send(Ok(QueuedPacket::new(id, Bytes::from(payload), mark)));
        id
    }

    pub fn disconnect(&self) {
        let _ = self.packets.send(Err(DomainError::QueueDisconnected(
            "netlink socket closed".to_string(),
        )));
    }

    pub async fn next_verdict(&mut self, within: Duration) -> Option<(PacketId, Verdict)> {
        tokio::time::timeout(within, self.verdicts.recv())
            .await
            .ok()
            .flatten()
    }

    /// Collects verdicts until none arrives for `quiet`.
    pub async fn verdicts_until_quiet(&mut self, quiet: Duration) -> Vec<(PacketId, Verdict)> {
        let mut out = Vec::new();
        while let Some(v) = self.next_verdict(quiet).await {
            out.push(v);
        }
        out
    }
}

/// Hands out prepared sessions in order; fails once they run out.
pub struct MockConnector {
    outcomes: Mutex<VecDeque<Result<MockQueueSession, DomainError>>>,
    connect_calls: AtomicU64,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            connect_calls: AtomicU64::new(0),
        }
    }

    pub fn push_session(&self, session: MockQueueSession) {
        self.outcomes.lock().unwrap().push_back(Ok(session));
    }

    pub fn push_failure(&self) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(DomainError::QueueTransport("bind failed".to_string())));
    }

    pub fn connect_calls(&self) -> u64 {
        self.connect_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PacketQueueConnector for MockConnector {
    async fn connect(&self, _queue_num: u16) -> Result<Box<dyn PacketQueueSession>, DomainError> {
        self.connect_calls.fetch_add(1, Ordering::Relaxed);
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(Ok(session)) => Ok(Box::new(session)),
            Some(Err(e)) => Err(e),
            None => Err(DomainError::QueueTransport("no queue available".to_string())),
        }
    }
}
