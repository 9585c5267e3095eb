use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MembershipConfig {
    /// Prefix of the kernel IP set names, followed by the family and set id.
    #[serde(default = "default_ipset_prefix")]
    pub ipset_prefix: String,

    #[serde(default = "default_ipset_command")]
    pub ipset_command: String,

    /// First delay before re-sending a failed backend update.
    #[serde(default = "default_retry_initial_backoff_ms")]
    pub retry_initial_backoff_ms: u64,

    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            ipset_prefix: default_ipset_prefix(),
            ipset_command: default_ipset_command(),
            retry_initial_backoff_ms: default_retry_initial_backoff_ms(),
            retry_max_backoff_ms: default_retry_max_backoff_ms(),
        }
    }
}

fn default_ipset_prefix() -> String {
    "dw-".to_string()
}

fn default_ipset_command() -> String {
    "ipset".to_string()
}

fn default_retry_initial_backoff_ms() -> u64 {
    500
}

fn default_retry_max_backoff_ms() -> u64 {
    30_000
}
