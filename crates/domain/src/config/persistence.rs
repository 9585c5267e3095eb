use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_path")]
    pub path: String,

    /// Debounce period between periodic saves.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Files written under a different epoch are discarded at load.
    #[serde(default)]
    pub epoch: i64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            flush_interval_secs: default_flush_interval_secs(),
            epoch: 0,
        }
    }
}

fn default_path() -> String {
    "/var/run/domainwall/dns-cache.txt".to_string()
}

fn default_flush_interval_secs() -> u64 {
    60
}
