use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::ports::{Clock, MappingStorePort, MembershipProjectorPort, SweepOutcome};

pub struct ExpireMappingsUseCase {
    store: Arc<dyn MappingStorePort>,
    projector: Arc<dyn MembershipProjectorPort>,
    clock: Arc<dyn Clock>,
}

impl ExpireMappingsUseCase {
    pub fn new(
        store: Arc<dyn MappingStorePort>,
        projector: Arc<dyn MembershipProjectorPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            projector,
            clock,
        }
    }

    #[instrument(skip(self))]
    pub fn execute(&self) -> SweepOutcome {
        let outcome = self.store.expire_sweep(self.clock.now());

        if !outcome.changed.is_empty() {
            let ticket = self.projector.on_names_changed(&outcome.changed);
            debug!(
                changed = outcome.changed.len(),
                deltas = ticket.deltas(),
                "Expired mappings projected"
            );
        }

        outcome
    }

    /// Forgets every mapping, e.g. after a persistence epoch change.
    pub fn expire_all(&self) -> usize {
        let changed = self.store.expire_all();
        if !changed.is_empty() {
            self.projector.on_names_changed(&changed);
        }
        info!(names = changed.len(), "All domain mappings expired");
        changed.len()
    }
}
