use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConntrackConfig {
    #[serde(default = "default_path")]
    pub path: String,

    /// How long a parsed conntrack table may be reused before re-reading.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Minimum snapshot age before a lookup miss re-reads the table.
    #[serde(default = "default_miss_reread_interval_ms")]
    pub miss_reread_interval_ms: u64,
}

impl Default for ConntrackConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            refresh_interval_ms: default_refresh_interval_ms(),
            miss_reread_interval_ms: default_miss_reread_interval_ms(),
        }
    }
}

fn default_path() -> String {
    "/proc/net/nf_conntrack".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    100
}

fn default_miss_reread_interval_ms() -> u64 {
    20
}
