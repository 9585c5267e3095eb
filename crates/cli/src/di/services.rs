use domainwall_application::services::TrustFilter;
use domainwall_domain::Config;
use domainwall_infrastructure::mapping::{DomainMappingStore, FileMappingPersistence};
use domainwall_infrastructure::membership::{
    AppliedMembership, DomainSetProjector, IpsetMembershipBackend, MembershipPushWorker,
};
use domainwall_infrastructure::system::{ProcConntrackReader, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Long-lived adapters shared by the use cases and the queue processors.
pub struct Services {
    pub clock: Arc<SystemClock>,
    pub store: Arc<DomainMappingStore>,
    pub persistence: Arc<FileMappingPersistence>,
    pub trust_filter: Arc<TrustFilter>,
    pub projector: Arc<DomainSetProjector>,
    pub applied: Arc<AppliedMembership>,
}

impl Services {
    /// The push worker is returned separately so the caller decides when it
    /// starts and stops.
    pub fn new(config: &Config) -> anyhow::Result<(Self, MembershipPushWorker)> {
        let policy = &config.dns_policy;
        let clock = Arc::new(SystemClock::new());

        let store = Arc::new(DomainMappingStore::new(
            clock.clone(),
            policy.extra_ttl_secs,
            policy.max_cname_depth,
        ));
        let persistence = Arc::new(FileMappingPersistence::new(
            config.persistence.path.clone(),
            config.persistence.epoch,
        ));

        let conntrack = Arc::new(ProcConntrackReader::new(
            config.conntrack.path.clone(),
            Duration::from_millis(config.conntrack.refresh_interval_ms),
        )
        .with_miss_reread_interval(Duration::from_millis(
            config.conntrack.miss_reread_interval_ms,
        )));
        let servers = policy.parsed_trusted_servers()?;
        let trust_filter = Arc::new(TrustFilter::new(
            &servers,
            &policy.node_addresses,
            conntrack,
            policy.require_conntrack_evidence,
        ));

        let backend = Arc::new(IpsetMembershipBackend::new(
            config.membership.ipset_command.clone(),
            config.membership.ipset_prefix.clone(),
        ));
        let (push_worker, pusher, applied) = MembershipPushWorker::new(backend);
        let push_worker = push_worker.with_retry_backoff(
            Duration::from_millis(config.membership.retry_initial_backoff_ms),
            Duration::from_millis(config.membership.retry_max_backoff_ms),
        );
        let projector = Arc::new(DomainSetProjector::new(store.clone(), pusher));

        info!(
            trusted_servers = servers.len(),
            node_addresses = policy.node_addresses.len(),
            require_conntrack_evidence = policy.require_conntrack_evidence,
            cache_file = %config.persistence.path,
            "DNS policy services initialized"
        );

        Ok((
            Self {
                clock,
                store,
                persistence,
                trust_filter,
                projector,
                applied,
            },
            push_worker,
        ))
    }
}
