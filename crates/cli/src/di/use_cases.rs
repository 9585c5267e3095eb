use super::Services;
use domainwall_application::use_cases::{
    ExpireMappingsUseCase, HandleDnsResponseUseCase, LoadMappingsUseCase,
    RegisterDomainSetUseCase, ReloadPolicyUseCase, SaveMappingsUseCase,
    UnregisterDomainSetUseCase,
};
use domainwall_domain::PolicyMode;
use domainwall_infrastructure::dns::HickoryDnsDecoder;
use std::sync::Arc;
use tokio::sync::watch;

pub struct UseCases {
    pub handle_dns_response: Arc<HandleDnsResponseUseCase>,
    pub load_mappings: Arc<LoadMappingsUseCase>,
    pub save_mappings: Arc<SaveMappingsUseCase>,
    pub expire_mappings: Arc<ExpireMappingsUseCase>,
    pub register_domain_set: Arc<RegisterDomainSetUseCase>,
    pub reload_policy: Arc<ReloadPolicyUseCase>,
}

impl UseCases {
    pub fn new(services: &Services, mode: watch::Sender<PolicyMode>) -> Self {
        let expire_mappings = Arc::new(ExpireMappingsUseCase::new(
            services.store.clone(),
            services.projector.clone(),
            services.clock.clone(),
        ));
        let register_domain_set = Arc::new(RegisterDomainSetUseCase::new(
            services.projector.clone(),
        ));
        let unregister_domain_set = Arc::new(UnregisterDomainSetUseCase::new(
            services.projector.clone(),
        ));

        Self {
            handle_dns_response: Arc::new(HandleDnsResponseUseCase::new(
                Arc::new(HickoryDnsDecoder::new()),
                services.trust_filter.clone(),
                services.store.clone(),
                services.projector.clone(),
                services.clock.clone(),
            )),
            load_mappings: Arc::new(LoadMappingsUseCase::new(
                services.store.clone(),
                services.persistence.clone(),
                services.projector.clone(),
                services.clock.clone(),
            )),
            save_mappings: Arc::new(SaveMappingsUseCase::new(
                services.store.clone(),
                services.persistence.clone(),
            )),
            reload_policy: Arc::new(ReloadPolicyUseCase::new(
                services.trust_filter.clone(),
                mode,
                services.persistence.clone(),
                services.projector.clone(),
                expire_mappings.clone(),
                register_domain_set.clone(),
                unregister_domain_set,
            )),
            expire_mappings,
            register_domain_set,
        }
    }
}
