use domainwall_domain::{CliOverrides, Config, DomainError, PolicyMode, SetId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::ports::{MappingPersistencePort, MembershipProjectorPort};
use crate::services::TrustFilter;
use crate::use_cases::domain_sets::{RegisterDomainSetUseCase, UnregisterDomainSetUseCase};
use crate::use_cases::mappings::ExpireMappingsUseCase;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReloadOutcome {
    pub mode_changed: bool,
    pub epoch_changed: bool,
    pub sets_registered: usize,
    pub sets_unregistered: usize,
}

/// Applies the runtime-adjustable parts of a configuration.
pub struct ReloadPolicyUseCase {
    trust_filter: Arc<TrustFilter>,
    mode: watch::Sender<PolicyMode>,
    persistence: Arc<dyn MappingPersistencePort>,
    projector: Arc<dyn MembershipProjectorPort>,
    expire: Arc<ExpireMappingsUseCase>,
    register: Arc<RegisterDomainSetUseCase>,
    unregister: Arc<UnregisterDomainSetUseCase>,
}

impl ReloadPolicyUseCase {
    pub fn new(
        trust_filter: Arc<TrustFilter>,
        mode: watch::Sender<PolicyMode>,
        persistence: Arc<dyn MappingPersistencePort>,
        projector: Arc<dyn MembershipProjectorPort>,
        expire: Arc<ExpireMappingsUseCase>,
        register: Arc<RegisterDomainSetUseCase>,
        unregister: Arc<UnregisterDomainSetUseCase>,
    ) -> Self {
        Self {
            trust_filter,
            mode,
            persistence,
            projector,
            expire,
            register,
            unregister,
        }
    }

    pub fn execute_from_file(
        &self,
        config_path: Option<&str>,
        overrides: CliOverrides,
    ) -> Result<ReloadOutcome, DomainError> {
        let config = Config::load(config_path, overrides)
            .map_err(|e| DomainError::ConfigError(format!("Config load error: {}", e)))?;
        self.execute(&config)
    }

    pub fn execute(&self, config: &Config) -> Result<ReloadOutcome, DomainError> {
        config
            .validate()
            .map_err(|e| DomainError::ConfigError(format!("Config validation error: {}", e)))?;

        let servers = config
            .dns_policy
            .parsed_trusted_servers()
            .map_err(|e| DomainError::ConfigError(e.to_string()))?;
        self.trust_filter
            .update_trusted(&servers, &config.dns_policy.node_addresses);

        let mut outcome = ReloadOutcome {
            mode_changed: self.mode.send_if_modified(|mode| {
                let changed = *mode != config.dns_policy.mode;
                *mode = config.dns_policy.mode;
                changed
            }),
            ..ReloadOutcome::default()
        };

        if self.persistence.epoch() != config.persistence.epoch {
            self.persistence.set_epoch(config.persistence.epoch);
            self.expire.expire_all();
            outcome.epoch_changed = true;
        }

        let wanted: HashSet<SetId> = config.domain_sets.iter().map(|s| s.set_id()).collect();
        for set_id in self.projector.set_ids() {
            if wanted.contains(&set_id) {
                continue;
            }
            match self.unregister.execute(&set_id) {
                Ok(_) => outcome.sets_unregistered += 1,
                Err(e) => warn!(set_id = %set_id, error = %e, "Failed to unregister domain set"),
            }
        }
        for set in &config.domain_sets {
            self.register.execute(set.set_id(), &set.domains)?;
            outcome.sets_registered += 1;
        }

        info!(
            mode = %config.dns_policy.mode,
            mode_changed = outcome.mode_changed,
            epoch_changed = outcome.epoch_changed,
            registered = outcome.sets_registered,
            unregistered = outcome.sets_unregistered,
            "DNS policy configuration reloaded"
        );

        Ok(outcome)
    }
}
