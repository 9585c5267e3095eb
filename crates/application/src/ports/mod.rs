mod clock;
mod conntrack;
mod dns_decoder;
mod mapping_persistence;
mod mapping_store;
mod membership;
mod packet_queue;

pub use clock::Clock;
pub use conntrack::{ConntrackEntry, ConntrackLookup};
pub use dns_decoder::DnsMessageDecoder;
pub use mapping_persistence::MappingPersistencePort;
pub use mapping_store::{MappingStorePort, StoreMutation, SweepOutcome};
pub use membership::{MembershipBackend, MembershipProjectorPort, MembershipView, ProjectionTicket};
pub use packet_queue::{PacketQueueConnector, PacketQueueSession};
