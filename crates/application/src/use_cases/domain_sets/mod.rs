pub mod register_domain_set;
pub mod unregister_domain_set;

pub use register_domain_set::RegisterDomainSetUseCase;
pub use unregister_domain_set::UnregisterDomainSetUseCase;
