use async_trait::async_trait;
use bytes::Bytes;
use domainwall_application::ports::{PacketQueueConnector, PacketQueueSession};
use domainwall_domain::{DefaultDisposition, DomainError, PacketId, QueuedPacket, Verdict};
use rustc_hash::FxHashMap;
use std::io;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Upper bound on how long a verdict waits while the queue is idle.
const IDLE_WAIT: Duration = Duration::from_millis(2);
const PACKET_CHANNEL_CAPACITY: usize = 4096;

type PacketResult = Result<QueuedPacket, DomainError>;

/// The parts of a netlink queue socket the pump relies on.
trait QueueSocket: Send + 'static {
    type Message;

    /// Non-blocking; `WouldBlock` when no packet is waiting.
    fn recv(&mut self) -> io::Result<Self::Message>;
    fn payload(message: &Self::Message) -> &[u8];
    fn mark(message: &Self::Message) -> u32;
    fn verdict(&mut self, message: Self::Message, verdict: Verdict) -> io::Result<()>;
}

impl QueueSocket for nfq::Queue {
    type Message = nfq::Message;

    fn recv(&mut self) -> io::Result<nfq::Message> {
        nfq::Queue::recv(self)
    }

    fn payload(message: &nfq::Message) -> &[u8] {
        message.get_payload()
    }

    fn mark(message: &nfq::Message) -> u32 {
        message.get_nfmark()
    }

    fn verdict(&mut self, mut message: nfq::Message, verdict: Verdict) -> io::Result<()> {
        match verdict {
            Verdict::Accept { mark } => {
                message.set_nfmark(mark);
                message.set_verdict(nfq::Verdict::Accept);
            }
            Verdict::Repeat { mark } => {
                message.set_nfmark(mark);
                message.set_verdict(nfq::Verdict::Repeat);
            }
            Verdict::Drop => message.set_verdict(nfq::Verdict::Drop),
        }
        nfq::Queue::verdict(self, message)
    }
}

/// Binds netfilter queues through `nfq`.
///
/// The netlink socket is owned by a dedicated blocking thread; packets and
/// verdicts cross over channels so a slow decision never blocks the socket.
/// Packets still unanswered when a session ends receive `fallback`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NfQueueConnector {
    fallback: DefaultDisposition,
}

impl NfQueueConnector {
    pub fn new(fallback: DefaultDisposition) -> Self {
        Self { fallback }
    }
}

#[async_trait]
impl PacketQueueConnector for NfQueueConnector {
    async fn connect(&self, queue_num: u16) -> Result<Box<dyn PacketQueueSession>, DomainError> {
        let queue = tokio::task::spawn_blocking(move || open_queue(queue_num))
            .await
            .map_err(|e| DomainError::QueueTransport(e.to_string()))?
            .map_err(|e| {
                DomainError::QueueTransport(format!("failed to bind queue {}: {}", queue_num, e))
            })?;

        let (session, _thread) = start_session(queue, queue_num, self.fallback)?;
        info!(queue_num, fallback = ?self.fallback, "Bound netfilter queue");
        Ok(Box::new(session))
    }
}

fn open_queue(queue_num: u16) -> io::Result<nfq::Queue> {
    let mut queue = nfq::Queue::open()?;
    queue.bind(queue_num)?;
    let _ = queue.set_nonblocking(true);
    // Overruns show up as lost packets instead of a socket error.
    let _ = queue.set_recv_enobufs(false);
    Ok(queue)
}

fn start_session<S: QueueSocket>(
    socket: S,
    queue_num: u16,
    fallback: DefaultDisposition,
) -> Result<(NfQueueSession, JoinHandle<()>), DomainError> {
    let (packet_tx, packet_rx) = mpsc::channel(PACKET_CHANNEL_CAPACITY);
    let (verdict_tx, verdict_rx) = std_mpsc::channel();

    let thread = std::thread::Builder::new()
        .name(format!("nfqueue-{}", queue_num))
        .spawn(move || {
            Pump {
                socket,
                queue_num,
                fallback,
                pending: FxHashMap::default(),
                next_id: 0,
                packets: packet_tx,
                verdicts: verdict_rx,
            }
            .run()
        })
        .map_err(|e| DomainError::QueueTransport(format!("failed to spawn queue thread: {}", e)))?;

    Ok((
        NfQueueSession {
            packets: packet_rx,
            verdicts: verdict_tx,
        },
        thread,
    ))
}

struct NfQueueSession {
    packets: mpsc::Receiver<PacketResult>,
    verdicts: std_mpsc::Sender<(PacketId, Verdict)>,
}

#[async_trait]
impl PacketQueueSession for NfQueueSession {
    async fn recv(&mut self) -> Result<QueuedPacket, DomainError> {
        match self.packets.recv().await {
            Some(packet) => packet,
            None => Err(DomainError::QueueDisconnected(
                "queue thread exited".to_string(),
            )),
        }
    }

    async fn set_verdict(&mut self, id: PacketId, verdict: Verdict) -> Result<(), DomainError> {
        self.verdicts
            .send((id, verdict))
            .map_err(|_| DomainError::QueueDisconnected("queue thread exited".to_string()))
    }
}

/// Socket loop: hands packets to the session and applies its verdicts
/// until the session is dropped.
struct Pump<S: QueueSocket> {
    socket: S,
    queue_num: u16,
    fallback: DefaultDisposition,
    pending: FxHashMap<PacketId, S::Message>,
    next_id: u64,
    packets: mpsc::Sender<PacketResult>,
    verdicts: std_mpsc::Receiver<(PacketId, Verdict)>,
}

impl<S: QueueSocket> Pump<S> {
    fn run(mut self) {
        let queue_num = self.queue_num;
        if let Err(e) = self.serve_socket() {
            warn!(queue_num, error = %e, "Netfilter queue receive failed");
            let _ = self
                .packets
                .blocking_send(Err(DomainError::QueueDisconnected(e.to_string())));
            // Packets already handed out still get their verdicts.
            while let Ok((id, verdict)) = self.verdicts.recv() {
                self.issue(id, verdict);
            }
        }
        self.release_unanswered();
    }

    /// `Ok` once the session is gone, `Err` when the socket fails.
    fn serve_socket(&mut self) -> io::Result<()> {
        let queue_num = self.queue_num;
        loop {
            loop {
                match self.verdicts.try_recv() {
                    Ok((id, verdict)) => self.issue(id, verdict),
                    Err(std_mpsc::TryRecvError::Empty) => break,
                    Err(std_mpsc::TryRecvError::Disconnected) => return Ok(()),
                }
            }

            match self.socket.recv() {
                Ok(message) => {
                    if !self.forward(message) {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    match self.verdicts.recv_timeout(IDLE_WAIT) {
                        Ok((id, verdict)) => self.issue(id, verdict),
                        Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                        Err(std_mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
                    }
                }
                Err(e) if is_transient(&e) => {
                    warn!(queue_num, error = %e, "Netfilter queue overrun");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn forward(&mut self, message: S::Message) -> bool {
        self.next_id += 1;
        let id = PacketId(self.next_id);
        let packet = QueuedPacket::new(
            id,
            Bytes::copy_from_slice(S::payload(&message)),
            S::mark(&message),
        );
        self.pending.insert(id, message);
        self.packets.blocking_send(Ok(packet)).is_ok()
    }

    fn issue(&mut self, id: PacketId, verdict: Verdict) {
        let queue_num = self.queue_num;
        let Some(message) = self.pending.remove(&id) else {
            debug!(queue_num, packet = %id, "Verdict for unknown packet");
            return;
        };
        if let Err(e) = self.socket.verdict(message, verdict) {
            warn!(queue_num, packet = %id, error = %e, "Failed to issue verdict");
        }
    }

    fn release_unanswered(&mut self) {
        let queue_num = self.queue_num;
        if self.pending.is_empty() {
            debug!(queue_num, "Queue session closed");
            return;
        }

        warn!(
            queue_num,
            unanswered = self.pending.len(),
            fallback = ?self.fallback,
            "Releasing unanswered packets"
        );
        for (id, message) in std::mem::take(&mut self.pending) {
            let verdict = self.fallback.verdict(S::mark(&message));
            if let Err(e) = self.socket.verdict(message, verdict) {
                debug!(queue_num, packet = %id, error = %e, "Failed to release packet");
            }
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::Interrupted || error.raw_os_error() == Some(libc::ENOBUFS)
}
