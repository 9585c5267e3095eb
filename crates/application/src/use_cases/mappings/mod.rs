pub mod expire_mappings;
pub mod load_mappings;
pub mod lookup_domain_ips;
pub mod save_mappings;

pub use expire_mappings::ExpireMappingsUseCase;
pub use load_mappings::{LoadMappingsUseCase, LoadOutcome};
pub use lookup_domain_ips::LookupDomainIpsUseCase;
pub use save_mappings::SaveMappingsUseCase;
