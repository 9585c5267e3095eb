use domainwall_application::use_cases::SaveMappingsUseCase;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 60;

/// Flushes the mapping store to disk on a fixed cadence rather than per
/// update, with one last flush on shutdown.
pub struct MappingPersistenceJob {
    save: Arc<SaveMappingsUseCase>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl MappingPersistenceJob {
    pub fn new(save: Arc<SaveMappingsUseCase>) -> Self {
        Self {
            save,
            interval: Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval_secs(self, secs: u64) -> Self {
        self.with_interval(Duration::from_secs(secs))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Starting mapping persistence job"
        );

        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("MappingPersistenceJob: writing final snapshot");
                    self.flush().await;
                    break;
                }
                _ = interval.tick() => self.flush().await,
            }
        }
        info!("MappingPersistenceJob: shutting down");
    }

    async fn flush(&self) {
        match self.save.execute().await {
            Ok(records) => debug!(records, "Mapping snapshot flushed"),
            Err(e) => error!(error = %e, "Mapping snapshot flush failed"),
        }
    }
}
