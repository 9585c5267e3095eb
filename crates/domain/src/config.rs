pub mod conntrack;
pub mod dns_policy;
pub mod domain_sets;
pub mod errors;
pub mod logging;
pub mod maintenance;
pub mod membership;
pub mod packet_queue;
pub mod persistence;
pub mod root;

pub use conntrack::ConntrackConfig;
pub use dns_policy::{DnsPolicyConfig, TrustedServer};
pub use domain_sets::DomainSetConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use maintenance::MaintenanceConfig;
pub use membership::MembershipConfig;
pub use packet_queue::PacketQueueConfig;
pub use persistence::PersistenceConfig;
pub use root::{CliOverrides, Config};
