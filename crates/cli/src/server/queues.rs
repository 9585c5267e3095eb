use domainwall_application::use_cases::HandleDnsResponseUseCase;
use domainwall_domain::config::PacketQueueConfig;
use domainwall_domain::PolicyMode;
use domainwall_infrastructure::membership::AppliedMembership;
use domainwall_infrastructure::queue::{
    DeniedPacketProcessor, DnsResponseProcessor, NfQueueConnector, QueueRunner,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One runner per kernel queue. Both follow the shared mode channel, so a
/// reload switches protocols without reconnecting.
pub fn spawn_queue_runners(
    config: &PacketQueueConfig,
    handle_dns_response: Arc<HandleDnsResponseUseCase>,
    applied: Arc<AppliedMembership>,
    mode: watch::Receiver<PolicyMode>,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let connector = Arc::new(NfQueueConnector::new(config.default_disposition));

    let dns = QueueRunner::new(
        config.dns_queue_num,
        connector.clone(),
        Arc::new(DnsResponseProcessor::new(
            handle_dns_response,
            mode.clone(),
            config,
        )),
        config,
    )
    .with_cancellation(shutdown.clone());

    let denied = QueueRunner::new(
        config.denied_queue_num,
        connector,
        Arc::new(DeniedPacketProcessor::new(applied, mode, config)),
        config,
    )
    .with_cancellation(shutdown);

    info!(
        dns_queue = config.dns_queue_num,
        denied_queue = config.denied_queue_num,
        "Packet queue runners starting"
    );

    vec![tokio::spawn(dns.run()), tokio::spawn(denied.run())]
}
