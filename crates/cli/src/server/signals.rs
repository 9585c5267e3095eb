use domainwall_application::use_cases::ReloadPolicyUseCase;
use domainwall_domain::CliOverrides;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Re-reads the configuration file on every SIGHUP until shutdown. A
/// rejected file leaves the running policy untouched.
pub async fn reload_on_hangup(
    reload: Arc<ReloadPolicyUseCase>,
    config_path: Option<String>,
    overrides: CliOverrides,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                info!("SIGHUP received, reloading configuration");
                if let Err(e) = reload.execute_from_file(config_path.as_deref(), overrides.clone()) {
                    error!(error = %e, "Configuration reload failed");
                }
            }
        }
    }
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() -> anyhow::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}
