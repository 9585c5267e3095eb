#![allow(dead_code)]
//! Store, projector, push worker and trust filter wired the way the agent
//! wires them, with the kernel-facing ports mocked.

use domainwall_application::ports::{MembershipProjectorPort, MembershipView};
use domainwall_application::services::TrustFilter;
use domainwall_application::use_cases::HandleDnsResponseUseCase;
use domainwall_domain::{DnsFlow, DnsObservation, DomainPattern, SetId, TransportProtocol, TrustedServer};
use domainwall_infrastructure::dns::HickoryDnsDecoder;
use domainwall_infrastructure::mapping::DomainMappingStore;
use domainwall_infrastructure::membership::{AppliedMembership, DomainSetProjector, MembershipPushWorker};
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::mock_ports::{t0, MockClock, MockConntrack, MockMembershipBackend};

pub const TRUSTED_SERVER: &str = "10.96.0.10:53";
pub const CLIENT: &str = "10.0.1.5:40000";

pub struct Pipeline {
    pub clock: Arc<MockClock>,
    pub store: Arc<DomainMappingStore>,
    pub projector: Arc<DomainSetProjector>,
    pub backend: MockMembershipBackend,
    pub applied: Arc<AppliedMembership>,
    pub conntrack: Arc<MockConntrack>,
    pub trust_filter: Arc<TrustFilter>,
    pub use_case: Arc<HandleDnsResponseUseCase>,
    shutdown: CancellationToken,
}

impl Pipeline {
    /// Trusts [`TRUSTED_SERVER`]; `node` lists the node's own addresses.
    pub fn new(require_evidence: bool, node: &[&str]) -> Self {
        let clock = Arc::new(MockClock::new(t0()));
        let store = Arc::new(DomainMappingStore::new(clock.clone(), 0, 8));
        let backend = MockMembershipBackend::new();
        let (worker, pusher, applied) = MembershipPushWorker::new(Arc::new(backend.clone()));
        let shutdown = CancellationToken::new();
        tokio::spawn(worker.run(shutdown.clone()));
        let projector = Arc::new(DomainSetProjector::new(store.clone(), pusher));

        let conntrack = Arc::new(MockConntrack::new());
        let servers: Vec<TrustedServer> = vec![TRUSTED_SERVER.parse().unwrap()];
        let node: Vec<IpAddr> = node.iter().map(|a| a.parse().unwrap()).collect();
        let trust_filter = Arc::new(TrustFilter::new(
            &servers,
            &node,
            conntrack.clone(),
            require_evidence,
        ));

        let use_case = Arc::new(HandleDnsResponseUseCase::new(
            Arc::new(HickoryDnsDecoder::new()),
            trust_filter.clone(),
            store.clone(),
            projector.clone(),
            clock.clone(),
        ));

        Self {
            clock,
            store,
            projector,
            backend,
            applied,
            conntrack,
            trust_filter,
            use_case,
            shutdown,
        }
    }

    /// Registers `set` and waits until its initial membership is applied.
    pub async fn register(&self, set: &str, patterns: &[&str]) {
        let patterns = patterns
            .iter()
            .map(|p| DomainPattern::parse(p).unwrap())
            .collect();
        assert!(self.projector.register_set(SetId::new(set), patterns).applied().await);
    }

    pub fn is_applied(&self, ip: &str) -> bool {
        self.applied.contains(&ip.parse().unwrap())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A UDP response travelling from `server` to `client`.
pub fn udp_observation(server: &str, client: &str, payload: Vec<u8>) -> DnsObservation {
    DnsObservation {
        flow: DnsFlow {
            client: client.parse().unwrap(),
            server: server.parse().unwrap(),
            protocol: TransportProtocol::Udp,
        },
        payload: payload.into(),
    }
}
