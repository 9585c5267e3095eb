use async_trait::async_trait;
use dashmap::DashSet;
use domainwall_application::ports::MembershipBackend;
use domainwall_domain::{DomainError, SetId};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Kernel limit on ipset names.
const MAX_SET_NAME_LEN: usize = 31;
/// `-` plus eight hex digits.
const NAME_HASH_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    V4,
    V6,
}

impl Family {
    fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Family::V4 => "v4-",
            Family::V6 => "v6-",
        }
    }

    fn ipset_family(&self) -> &'static str {
        match self {
            Family::V4 => "inet",
            Family::V6 => "inet6",
        }
    }
}

/// Materializes domain sets as `hash:ip` ipsets, one per address family.
pub struct IpsetMembershipBackend {
    command: String,
    prefix: String,
    created: DashSet<String>,
}

impl IpsetMembershipBackend {
    pub fn new(command: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            prefix: prefix.into(),
            created: DashSet::new(),
        }
    }

    /// Names too long for the kernel keep a readable head and end in a
    /// hash of the full set id, so distinct ids never share a set.
    pub fn set_name(&self, set_id: &SetId, ip: &IpAddr) -> String {
        let mut name = format!("{}{}{}", self.prefix, Family::of(ip).tag(), set_id);
        if name.len() > MAX_SET_NAME_LEN {
            let mut cut = MAX_SET_NAME_LEN - NAME_HASH_LEN;
            while !name.is_char_boundary(cut) {
                cut -= 1;
            }
            name.truncate(cut);
            name.push_str(&format!("-{:08x}", id_hash(set_id)));
        }
        name
    }

    async fn run(&self, args: &[&str]) -> Result<(), DomainError> {
        let output = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DomainError::MembershipBackend(format!("failed to run {}: {}", self.command, e))
            })?;

        if output.status.success() {
            debug!(args = ?args, "ipset command succeeded");
            Ok(())
        } else {
            Err(DomainError::MembershipBackend(format!(
                "{} {} exited with {}: {}",
                self.command,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    async fn ensure_set(&self, name: &str, family: Family) -> Result<(), DomainError> {
        if self.created.contains(name) {
            return Ok(());
        }
        self.run(&[
            "create",
            name,
            "hash:ip",
            "family",
            family.ipset_family(),
            "-exist",
        ])
        .await?;
        self.created.insert(name.to_string());
        info!(set = name, "ipset created");
        Ok(())
    }
}

fn id_hash(set_id: &SetId) -> u32 {
    let mut hasher = FxHasher::default();
    set_id.as_str().hash(&mut hasher);
    let hash = hasher.finish();
    (hash ^ (hash >> 32)) as u32
}

#[async_trait]
impl MembershipBackend for IpsetMembershipBackend {
    async fn add_member(&self, set_id: &SetId, ip: IpAddr) -> Result<(), DomainError> {
        let name = self.set_name(set_id, &ip);
        self.ensure_set(&name, Family::of(&ip)).await?;
        self.run(&["add", &name, &ip.to_string(), "-exist"]).await
    }

    async fn remove_member(&self, set_id: &SetId, ip: IpAddr) -> Result<(), DomainError> {
        let name = self.set_name(set_id, &ip);
        if !self.created.contains(&name) {
            return Ok(());
        }
        self.run(&["del", &name, &ip.to_string(), "-exist"]).await
    }
}
