use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Identifier of a policy domain-selector set, as known to the firewall backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetId(Arc<str>);

impl SetId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaOp {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MembershipDelta {
    pub set_id: SetId,
    pub ip: IpAddr,
    pub op: DeltaOp,
}

impl MembershipDelta {
    pub fn add(set_id: SetId, ip: IpAddr) -> Self {
        Self {
            set_id,
            ip,
            op: DeltaOp::Add,
        }
    }

    pub fn remove(set_id: SetId, ip: IpAddr) -> Self {
        Self {
            set_id,
            ip,
            op: DeltaOp::Remove,
        }
    }
}
