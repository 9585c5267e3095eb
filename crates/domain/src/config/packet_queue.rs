use super::errors::ConfigError;
use crate::packet::RetryBudget;
use crate::policy_mode::DefaultDisposition;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacketQueueConfig {
    /// Queue carrying DNS responses towards local workloads.
    #[serde(default = "default_dns_queue_num")]
    pub dns_queue_num: u16,

    /// Queue carrying packets that policy would otherwise deny.
    #[serde(default = "default_denied_queue_num")]
    pub denied_queue_num: u16,

    /// Upper bound on the delay added to a DNS response.
    #[serde(default = "default_dns_hold_timeout_ms")]
    pub dns_hold_timeout_ms: u64,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    #[serde(default = "default_max_retry_window_ms")]
    pub max_retry_window_ms: u64,

    #[serde(default = "default_hold_check_interval_ms")]
    pub hold_check_interval_ms: u64,

    #[serde(default = "default_max_held_packets")]
    pub max_held_packets: usize,

    /// Mark bit set on repeated packets so the kernel does not queue them again.
    #[serde(default = "default_do_not_repeat_mark")]
    pub do_not_repeat_mark: u32,

    #[serde(default)]
    pub default_disposition: DefaultDisposition,

    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,

    #[serde(default = "default_reconnect_initial_backoff_ms")]
    pub reconnect_initial_backoff_ms: u64,

    #[serde(default = "default_reconnect_max_backoff_ms")]
    pub reconnect_max_backoff_ms: u64,
}

impl Default for PacketQueueConfig {
    fn default() -> Self {
        Self {
            dns_queue_num: default_dns_queue_num(),
            denied_queue_num: default_denied_queue_num(),
            dns_hold_timeout_ms: default_dns_hold_timeout_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            max_retry_attempts: default_max_retry_attempts(),
            max_retry_window_ms: default_max_retry_window_ms(),
            hold_check_interval_ms: default_hold_check_interval_ms(),
            max_held_packets: default_max_held_packets(),
            do_not_repeat_mark: default_do_not_repeat_mark(),
            default_disposition: DefaultDisposition::default(),
            drain_grace_ms: default_drain_grace_ms(),
            reconnect_initial_backoff_ms: default_reconnect_initial_backoff_ms(),
            reconnect_max_backoff_ms: default_reconnect_max_backoff_ms(),
        }
    }
}

impl PacketQueueConfig {
    pub fn dns_hold_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_hold_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn max_retry_window(&self) -> Duration {
        Duration::from_millis(self.max_retry_window_ms)
    }

    pub fn hold_check_interval(&self) -> Duration {
        Duration::from_millis(self.hold_check_interval_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }

    pub fn retry_budget(&self) -> RetryBudget {
        RetryBudget {
            max_attempts: self.max_retry_attempts,
            window: self.max_retry_window(),
            interval: self.retry_interval(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns_queue_num == self.denied_queue_num {
            return Err(ConfigError::Validation(
                "dns_queue_num and denied_queue_num must differ".to_string(),
            ));
        }
        if self.hold_check_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "hold_check_interval_ms cannot be 0".to_string(),
            ));
        }
        if self.max_retry_attempts == 0 {
            return Err(ConfigError::Validation(
                "max_retry_attempts cannot be 0".to_string(),
            ));
        }
        if self.do_not_repeat_mark == 0 {
            return Err(ConfigError::Validation(
                "do_not_repeat_mark cannot be 0".to_string(),
            ));
        }
        if self.reconnect_initial_backoff_ms > self.reconnect_max_backoff_ms {
            return Err(ConfigError::Validation(
                "reconnect_initial_backoff_ms exceeds reconnect_max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_dns_queue_num() -> u16 {
    100
}
fn default_denied_queue_num() -> u16 {
    101
}
fn default_dns_hold_timeout_ms() -> u64 {
    2000
}
fn default_retry_interval_ms() -> u64 {
    100
}
fn default_max_retry_attempts() -> u32 {
    10
}
fn default_max_retry_window_ms() -> u64 {
    1000
}
fn default_hold_check_interval_ms() -> u64 {
    50
}
fn default_max_held_packets() -> usize {
    100
}
fn default_do_not_repeat_mark() -> u32 {
    0x0040_0000
}
fn default_drain_grace_ms() -> u64 {
    500
}
fn default_reconnect_initial_backoff_ms() -> u64 {
    100
}
fn default_reconnect_max_backoff_ms() -> u64 {
    5000
}
