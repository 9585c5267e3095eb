use domainwall_domain::DomainError;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::ports::{MappingPersistencePort, MappingStorePort};

pub struct SaveMappingsUseCase {
    store: Arc<dyn MappingStorePort>,
    persistence: Arc<dyn MappingPersistencePort>,
}

impl SaveMappingsUseCase {
    pub fn new(
        store: Arc<dyn MappingStorePort>,
        persistence: Arc<dyn MappingPersistencePort>,
    ) -> Self {
        Self { store, persistence }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self) -> Result<usize, DomainError> {
        let records = self.store.snapshot();
        self.persistence.save(&records).await?;
        debug!(records = records.len(), "Domain mappings saved");
        Ok(records.len())
    }
}
