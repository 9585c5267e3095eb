use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::conntrack::ConntrackConfig;
use super::dns_policy::DnsPolicyConfig;
use super::domain_sets::DomainSetConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::maintenance::MaintenanceConfig;
use super::membership::MembershipConfig;
use super::packet_queue::PacketQueueConfig;
use super::persistence::PersistenceConfig;
use crate::policy_mode::PolicyMode;

const LOCAL_CONFIG_PATH: &str = "domainwall.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/domainwall/config.toml";

/// Main configuration structure for domainwall
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Trust, mode and TTL handling for snooped DNS
    #[serde(default)]
    pub dns_policy: DnsPolicyConfig,

    /// Mapping file location and flush cadence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// Kernel packet queue behaviour
    #[serde(default)]
    pub packet_queue: PacketQueueConfig,

    #[serde(default)]
    pub conntrack: ConntrackConfig,

    #[serde(default)]
    pub membership: MembershipConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Statically declared domain selector sets
    #[serde(default)]
    pub domain_sets: Vec<DomainSetConfig>,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. domainwall.toml in current directory
    /// 3. /etc/domainwall/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path.or_else(|| Self::get_config_path_str()) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(mode) = overrides.mode {
            self.dns_policy.mode = mode;
        }
        if let Some(path) = overrides.cache_file {
            self.persistence.path = path;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dns_policy.validate()?;
        self.packet_queue.validate()?;

        if self.persistence.flush_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "persistence flush_interval_secs cannot be 0".to_string(),
            ));
        }
        if self.persistence.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "persistence path cannot be empty".to_string(),
            ));
        }
        if self.maintenance.expiry_sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "expiry_sweep_interval_secs cannot be 0".to_string(),
            ));
        }
        if self.membership.retry_initial_backoff_ms == 0 {
            return Err(ConfigError::Validation(
                "membership retry_initial_backoff_ms cannot be 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for set in &self.domain_sets {
            if !seen.insert(set.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate domain set id '{}'",
                    set.id
                )));
            }
            set.patterns().map_err(|e| {
                ConfigError::Validation(format!("Domain set '{}': {}", set.id, e))
            })?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;
        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        Self::get_config_path_str().map(str::to_string)
    }

    fn get_config_path_str() -> Option<&'static str> {
        [LOCAL_CONFIG_PATH, SYSTEM_CONFIG_PATH]
            .into_iter()
            .find(|p| std::path::Path::new(p).exists())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub mode: Option<PolicyMode>,
    pub cache_file: Option<String>,
    pub log_level: Option<String>,
}
