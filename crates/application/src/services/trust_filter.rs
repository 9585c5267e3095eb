use arc_swap::ArcSwap;
use domainwall_domain::{DnsFlow, TrustedServer};
use rustc_hash::FxHashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::debug;

use crate::ports::ConntrackLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntrustedReason {
    /// Neither the apparent nor the kernel-recorded server is trusted.
    UntrustedServer,
    /// No matching outgoing request was tracked.
    NoConntrackEvidence,
    ConntrackUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    Trusted { server: SocketAddr },
    Untrusted(UntrustedReason),
}

impl TrustDecision {
    pub fn is_trusted(&self) -> bool {
        matches!(self, TrustDecision::Trusted { .. })
    }
}

#[derive(Debug, Default)]
struct TrustedSet {
    servers: FxHashSet<SocketAddr>,
    node_addresses: FxHashSet<IpAddr>,
}

impl TrustedSet {
    fn new(servers: &[TrustedServer], node_addresses: &[IpAddr]) -> Self {
        Self {
            servers: servers.iter().map(TrustedServer::addr).collect(),
            node_addresses: node_addresses.iter().copied().collect(),
        }
    }

    fn trusts(&self, server: &SocketAddr) -> bool {
        self.servers.contains(server)
    }

    /// Host-local resolution: the node talking to its own resolver.
    fn is_node_local(&self, client: &SocketAddr, server: &SocketAddr) -> bool {
        self.node_addresses.contains(&client.ip()) && self.node_addresses.contains(&server.ip())
    }
}

/// Decides whether a decoded DNS response may update the mapping store.
pub struct TrustFilter {
    trusted: ArcSwap<TrustedSet>,
    conntrack: Arc<dyn ConntrackLookup>,
    require_evidence: bool,
}

impl TrustFilter {
    pub fn new(
        servers: &[TrustedServer],
        node_addresses: &[IpAddr],
        conntrack: Arc<dyn ConntrackLookup>,
        require_evidence: bool,
    ) -> Self {
        Self {
            trusted: ArcSwap::from_pointee(TrustedSet::new(servers, node_addresses)),
            conntrack,
            require_evidence,
        }
    }

    pub fn update_trusted(&self, servers: &[TrustedServer], node_addresses: &[IpAddr]) {
        self.trusted
            .store(Arc::new(TrustedSet::new(servers, node_addresses)));
        debug!(servers = servers.len(), "Trusted DNS servers updated");
    }

    pub async fn evaluate(&self, flow: &DnsFlow) -> TrustDecision {
        let trusted = self.trusted.load_full();

        if !self.require_evidence {
            return if trusted.trusts(&flow.server)
                || trusted.is_node_local(&flow.client, &flow.server)
            {
                TrustDecision::Trusted {
                    server: flow.server,
                }
            } else {
                TrustDecision::Untrusted(UntrustedReason::UntrustedServer)
            };
        }

        let entry = match self.conntrack.find_request(flow).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return TrustDecision::Untrusted(UntrustedReason::NoConntrackEvidence),
            Err(e) => {
                debug!(error = %e, "Conntrack lookup failed");
                return TrustDecision::Untrusted(UntrustedReason::ConntrackUnavailable);
            }
        };

        // The apparent source is attacker controlled; only identities the
        // kernel recorded for the request count.
        match entry
            .server_identities()
            .into_iter()
            .find(|server| trusted.trusts(server) || trusted.is_node_local(&flow.client, server))
        {
            Some(server) => TrustDecision::Trusted { server },
            None => TrustDecision::Untrusted(UntrustedReason::UntrustedServer),
        }
    }
}
