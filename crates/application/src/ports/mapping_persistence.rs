use async_trait::async_trait;
use domainwall_domain::{DomainError, DomainRecord};

#[async_trait]
pub trait MappingPersistencePort: Send + Sync {
    /// A missing or empty file is not an error and yields no records.
    async fn load(&self) -> Result<Vec<DomainRecord>, DomainError>;

    async fn save(&self, records: &[DomainRecord]) -> Result<(), DomainError>;

    fn epoch(&self) -> i64;

    fn set_epoch(&self, epoch: i64);
}
