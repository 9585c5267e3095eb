pub mod config;
pub mod dns;
pub mod domain_sets;
pub mod mappings;

pub use config::{ReloadOutcome, ReloadPolicyUseCase};
pub use dns::{DnsResponseOutcome, HandleDnsResponseUseCase};
pub use domain_sets::{RegisterDomainSetUseCase, UnregisterDomainSetUseCase};
pub use mappings::{
    ExpireMappingsUseCase, LoadMappingsUseCase, LoadOutcome, LookupDomainIpsUseCase,
    SaveMappingsUseCase,
};
