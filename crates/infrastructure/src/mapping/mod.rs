pub mod persistence;
pub mod store;

pub use persistence::FileMappingPersistence;
pub use store::DomainMappingStore;
