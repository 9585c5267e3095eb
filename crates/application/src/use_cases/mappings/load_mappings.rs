use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::ports::{Clock, MappingPersistencePort, MappingStorePort, MembershipProjectorPort};

/// Mappings with this little lifetime left are not worth restoring.
const MIN_REMAINING_SECS: i64 = 1;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub loaded: usize,
    pub skipped_expired: usize,
}

/// Pre-warms the store from the persistence file before the agent is ready.
pub struct LoadMappingsUseCase {
    store: Arc<dyn MappingStorePort>,
    persistence: Arc<dyn MappingPersistencePort>,
    projector: Arc<dyn MembershipProjectorPort>,
    clock: Arc<dyn Clock>,
}

impl LoadMappingsUseCase {
    pub fn new(
        store: Arc<dyn MappingStorePort>,
        persistence: Arc<dyn MappingPersistencePort>,
        projector: Arc<dyn MembershipProjectorPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            persistence,
            projector,
            clock,
        }
    }

    /// Never fails: an unreadable file degrades to an empty store.
    #[instrument(skip(self))]
    pub async fn execute(&self) -> LoadOutcome {
        let records = match self.persistence.load().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Discarding persisted DNS mappings");
                return LoadOutcome::default();
            }
        };

        let cutoff = self.clock.now() + Duration::seconds(MIN_REMAINING_SECS);
        let total = records.len();
        let live: Vec<_> = records
            .into_iter()
            .filter(|record| record.expiry > cutoff)
            .collect();

        let outcome = LoadOutcome {
            loaded: live.len(),
            skipped_expired: total - live.len(),
        };

        let mutation = self.store.restore(live);
        if !mutation.changed.is_empty() {
            self.projector.on_names_changed(&mutation.changed);
        }

        info!(
            loaded = outcome.loaded,
            skipped = outcome.skipped_expired,
            "Persisted DNS mappings loaded"
        );
        outcome
    }
}
