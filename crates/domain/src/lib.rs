//! domainwall domain layer
pub mod config;
pub mod dns_message;
pub mod domain_name;
pub mod domain_pattern;
pub mod domain_record;
pub mod errors;
pub mod membership;
pub mod packet;
pub mod policy_mode;

pub use config::{CliOverrides, Config, ConfigError, TrustedServer};
pub use dns_message::{DnsAnswer, DnsFlow, DnsObservation, ParsedDnsResponse, TransportProtocol};
pub use domain_name::DomainName;
pub use domain_pattern::DomainPattern;
pub use domain_record::{DomainRecord, MappingValue, RecordKind};
pub use errors::DomainError;
pub use membership::{DeltaOp, MembershipDelta, SetId};
pub use packet::{
    PacketId, PacketState, PendingPacket, QueuedPacket, ReleaseReason, RetryBudget, Verdict,
};
pub use policy_mode::{DefaultDisposition, PolicyMode};
