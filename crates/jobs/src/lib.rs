pub mod mapping_expiry;
pub mod mapping_persistence;
pub mod runner;

pub use mapping_expiry::MappingExpiryJob;
pub use mapping_persistence::MappingPersistenceJob;
pub use runner::{JobRunner, RunningJobs};
