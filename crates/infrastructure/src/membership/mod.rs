pub mod ipset;
pub mod pattern_index;
pub mod projector;
pub mod push;

pub use ipset::IpsetMembershipBackend;
pub use pattern_index::PatternIndex;
pub use projector::DomainSetProjector;
pub use push::{AppliedMembership, MembershipPushWorker, MembershipPusher};
