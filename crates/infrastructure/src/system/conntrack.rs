use async_trait::async_trait;
use domainwall_application::ports::{ConntrackEntry, ConntrackLookup};
use domainwall_domain::{DnsFlow, DomainError, TransportProtocol};
use rustc_hash::FxHashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

type TupleKey = (TransportProtocol, SocketAddr, SocketAddr);

struct Snapshot {
    read_at: Instant,
    /// (protocol, server side, client side) -> entry, for both tuple directions.
    by_tuple: FxHashMap<TupleKey, ConntrackEntry>,
}

impl Snapshot {
    fn find(&self, flow: &DnsFlow) -> Option<ConntrackEntry> {
        self.by_tuple
            .get(&(flow.protocol, flow.server, flow.client))
            .filter(|entry| entry.matches_response(flow))
            .copied()
    }
}

/// Reads `/proc/net/nf_conntrack` for evidence that a DNS request was sent.
///
/// A lookup miss re-reads the table at most once per `miss_reread`, and
/// concurrent misses share a single read.
pub struct ProcConntrackReader {
    path: String,
    refresh: Duration,
    miss_reread: Duration,
    cache: RwLock<Option<Arc<Snapshot>>>,
    reading: Mutex<()>,
    reads: AtomicU64,
}

impl ProcConntrackReader {
    pub fn new(path: impl Into<String>, refresh: Duration) -> Self {
        Self {
            path: path.into(),
            refresh,
            miss_reread: Duration::ZERO,
            cache: RwLock::new(None),
            reading: Mutex::new(()),
            reads: AtomicU64::new(0),
        }
    }

    /// Capped at the refresh interval.
    pub fn with_miss_reread_interval(mut self, interval: Duration) -> Self {
        self.miss_reread = interval.min(self.refresh);
        self
    }

    /// Number of times the table has been read.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn with_path(path: String) -> Self {
        Self::new(path, Duration::from_secs(60))
    }

    fn cached(&self) -> Option<Arc<Snapshot>> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn refresh_snapshot(&self) -> Result<Arc<Snapshot>, DomainError> {
        let reads = self.reads.fetch_add(1, Ordering::Relaxed) + 1;
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            DomainError::Conntrack(format!("failed to read {}: {}", self.path, e))
        })?;

        let mut by_tuple = FxHashMap::default();
        for line in content.lines() {
            if let Some(entry) = parse_line(line) {
                by_tuple.insert((entry.protocol, entry.reply_src, entry.reply_dst), entry);
                by_tuple
                    .entry((entry.protocol, entry.original_dst, entry.original_src))
                    .or_insert(entry);
            }
        }
        debug!(entries = by_tuple.len(), reads, "Conntrack table parsed");

        let snapshot = Arc::new(Snapshot {
            read_at: Instant::now(),
            by_tuple,
        });
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[async_trait]
impl ConntrackLookup for ProcConntrackReader {
    async fn find_request(&self, response: &DnsFlow) -> Result<Option<ConntrackEntry>, DomainError> {
        let asked_at = Instant::now();
        if let Some(snapshot) = self.cached() {
            let age = snapshot.read_at.elapsed();
            if age < self.refresh {
                if let Some(entry) = snapshot.find(response) {
                    return Ok(Some(entry));
                }
                if age < self.miss_reread {
                    return Ok(None);
                }
            }
        }

        // Stale or missing: the request may have been tracked after the last read.
        let _reading = self.reading.lock().await;
        if let Some(snapshot) = self.cached() {
            if snapshot.read_at >= asked_at {
                return Ok(snapshot.find(response));
            }
        }
        Ok(self.refresh_snapshot().await?.find(response))
    }
}

struct Tuple {
    src: IpAddr,
    dst: IpAddr,
    sport: u16,
    dport: u16,
}

/// Parses one line of `/proc/net/nf_conntrack`:
///
/// `ipv4 2 udp 17 28 src=A dst=B sport=P dport=Q [UNREPLIED] src=B dst=A sport=Q dport=P mark=0 use=2`
fn parse_line(line: &str) -> Option<ConntrackEntry> {
    let mut fields = line.split_whitespace();
    let _family = fields.next()?;
    let _family_num = fields.next()?;
    let protocol = match fields.next()? {
        "udp" => TransportProtocol::Udp,
        "tcp" => TransportProtocol::Tcp,
        _ => return None,
    };

    let mut tuples: Vec<Tuple> = Vec::with_capacity(2);
    let mut src = None;
    let mut dst = None;
    let mut sport = None;

    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        match key {
            "src" => src = value.parse().ok(),
            "dst" => dst = value.parse().ok(),
            "sport" => sport = value.parse().ok(),
            "dport" => {
                let dport = value.parse().ok()?;
                tuples.push(Tuple {
                    src: src.take()?,
                    dst: dst.take()?,
                    sport: sport.take()?,
                    dport,
                });
                if tuples.len() == 2 {
                    break;
                }
            }
            _ => {}
        }
    }

    let [original, reply]: [Tuple; 2] = tuples.try_into().ok()?;
    Some(ConntrackEntry {
        protocol,
        original_src: SocketAddr::new(original.src, original.sport),
        original_dst: SocketAddr::new(original.dst, original.dport),
        reply_src: SocketAddr::new(reply.src, reply.sport),
        reply_dst: SocketAddr::new(reply.dst, reply.dport),
    })
}
