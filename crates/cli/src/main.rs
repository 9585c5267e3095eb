use clap::Parser;
use domainwall_application::ports::MappingStorePort;
use domainwall_domain::{CliOverrides, Config, PolicyMode};
use domainwall_jobs::{JobRunner, MappingExpiryJob, MappingPersistenceJob};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod bootstrap;
mod di;
mod server;

/// Upper bound on waiting for static domain sets to reach the dataplane
/// before packets are processed.
const INITIAL_PROGRAMMING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "domainwall")]
#[command(version)]
#[command(about = "DNS-aware domain policy engine for netfilter dataplanes")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Consistency mode (NoDelay, DelayDNSResponse, DelayDeniedPacket)
    #[arg(long)]
    mode: Option<PolicyMode>,

    /// Mapping persistence file
    #[arg(long, value_name = "FILE")]
    cache_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        mode: cli.mode,
        cache_file: cli.cache_file.clone(),
        log_level: cli.log_level.clone(),
    };
    let config = bootstrap::load_config(cli.config.as_deref(), overrides.clone())?;

    bootstrap::init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.dns_policy.mode,
        "Starting domainwall"
    );

    let shutdown = CancellationToken::new();
    let push_shutdown = CancellationToken::new();

    let (services, push_worker) = di::Services::new(&config)?;
    let push_handle = tokio::spawn(push_worker.run(push_shutdown.clone()));

    let (mode_tx, mode_rx) = watch::channel(config.dns_policy.mode);
    let use_cases = di::UseCases::new(&services, mode_tx);

    // Pre-warm before any packet is processed.
    use_cases.load_mappings.execute().await;
    register_domain_sets(&use_cases, &config).await;

    let jobs = JobRunner::new()
        .with_mapping_expiry(
            MappingExpiryJob::new(use_cases.expire_mappings.clone())
                .with_interval_secs(config.maintenance.expiry_sweep_interval_secs),
        )
        .with_mapping_persistence(
            MappingPersistenceJob::new(use_cases.save_mappings.clone())
                .with_interval_secs(config.persistence.flush_interval_secs),
        )
        .with_shutdown_token(shutdown.clone())
        .start()
        .await;

    let queues = server::spawn_queue_runners(
        &config.packet_queue,
        use_cases.handle_dns_response.clone(),
        services.applied.clone(),
        mode_rx,
        shutdown.clone(),
    );

    let reload = tokio::spawn(server::reload_on_hangup(
        use_cases.reload_policy.clone(),
        cli.config.clone(),
        overrides,
        shutdown.clone(),
    ));

    info!(
        mappings = services.store.len(),
        members = services.applied.len(),
        "domainwall ready"
    );

    server::shutdown_signal().await?;
    info!("Shutdown requested");
    shutdown.cancel();

    for handle in queues {
        if let Err(e) = handle.await {
            error!(error = %e, "Packet queue runner panicked");
        }
    }
    jobs.join().await;
    match reload.await {
        Ok(Err(e)) => warn!(error = %e, "Reload handler stopped with an error"),
        Err(e) => error!(error = %e, "Reload handler panicked"),
        Ok(Ok(())) => {}
    }

    push_shutdown.cancel();
    if let Err(e) = push_handle.await {
        error!(error = %e, "Membership push worker panicked");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn register_domain_sets(use_cases: &di::UseCases, config: &Config) {
    let mut tickets = Vec::with_capacity(config.domain_sets.len());
    for set in &config.domain_sets {
        match use_cases
            .register_domain_set
            .execute(set.set_id(), &set.domains)
        {
            Ok(ticket) => tickets.push((set.id.as_str(), ticket)),
            Err(e) => error!(set_id = %set.id, error = %e, "Failed to register domain set"),
        }
    }

    for (set_id, ticket) in tickets {
        if !ticket.wait(INITIAL_PROGRAMMING_TIMEOUT).await {
            warn!(set_id, "Domain set not fully programmed before startup");
        }
    }
}
