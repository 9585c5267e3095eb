use domainwall_application::use_cases::ExpireMappingsUseCase;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_INTERVAL_SECS: u64 = 13;

/// Periodically drops expired mappings and projects the resulting
/// membership removals.
pub struct MappingExpiryJob {
    expire: Arc<ExpireMappingsUseCase>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl MappingExpiryJob {
    pub fn new(expire: Arc<ExpireMappingsUseCase>) -> Self {
        Self {
            expire,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
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
            "Starting mapping expiry job"
        );

        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("MappingExpiryJob: shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let outcome = self.expire.execute();
                    if outcome.expired > 0 || outcome.collected > 0 {
                        info!(
                            expired = outcome.expired,
                            collected = outcome.collected,
                            changed = outcome.changed.len(),
                            remaining = outcome.remaining,
                            "Expired DNS mappings swept"
                        );
                    } else {
                        debug!(remaining = outcome.remaining, "Nothing to expire");
                    }
                }
            }
        }
    }
}
