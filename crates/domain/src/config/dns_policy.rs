use super::errors::ConfigError;
use crate::policy_mode::PolicyMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

pub const DNS_PORT: u16 = 53;

/// Upper bound accepted for `max_cname_depth`.
pub const MAX_CNAME_DEPTH_LIMIT: usize = 32;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsPolicyConfig {
    #[serde(default)]
    pub mode: PolicyMode,

    /// `ip` or `ip:port` entries; the port defaults to 53.
    #[serde(default = "default_trusted_servers")]
    pub trusted_servers: Vec<String>,

    /// Addresses of this node; resolvers listening on them are trusted for
    /// host-local clients.
    #[serde(default)]
    pub node_addresses: Vec<IpAddr>,

    #[serde(default = "default_true")]
    pub require_conntrack_evidence: bool,

    /// Added to every DNS TTL before computing the mapping expiry.
    #[serde(default)]
    pub extra_ttl_secs: u32,

    #[serde(default = "default_max_cname_depth")]
    pub max_cname_depth: usize,
}

impl Default for DnsPolicyConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::default(),
            trusted_servers: default_trusted_servers(),
            node_addresses: Vec::new(),
            require_conntrack_evidence: true,
            extra_ttl_secs: 0,
            max_cname_depth: default_max_cname_depth(),
        }
    }
}

impl DnsPolicyConfig {
    pub fn parsed_trusted_servers(&self) -> Result<Vec<TrustedServer>, ConfigError> {
        self.trusted_servers
            .iter()
            .map(|raw| raw.parse::<TrustedServer>())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_trusted_servers()?;

        if self.max_cname_depth == 0 || self.max_cname_depth > MAX_CNAME_DEPTH_LIMIT {
            return Err(ConfigError::Validation(format!(
                "max_cname_depth must be between 1 and {}",
                MAX_CNAME_DEPTH_LIMIT
            )));
        }
        Ok(())
    }
}

/// A DNS server address whose answers may influence policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrustedServer(pub SocketAddr);

impl TrustedServer {
    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl FromStr for TrustedServer {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(addr) = SocketAddr::from_str(trimmed) {
            return Ok(Self(addr));
        }
        IpAddr::from_str(trimmed)
            .map(|ip| Self(SocketAddr::new(ip, DNS_PORT)))
            .map_err(|_| ConfigError::InvalidTrustedServer(s.to_string()))
    }
}

impl fmt::Display for TrustedServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_trusted_servers() -> Vec<String> {
    vec!["127.0.0.53:53".to_string()]
}

fn default_max_cname_depth() -> usize {
    8
}

fn default_true() -> bool {
    true
}
