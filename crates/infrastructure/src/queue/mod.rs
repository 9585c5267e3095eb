pub mod denied_packet;
pub mod dns_response;
pub mod held_packets;
pub mod nfqueue;
pub mod runner;

pub use denied_packet::DeniedPacketProcessor;
pub use dns_response::DnsResponseProcessor;
pub use held_packets::{HeldPacketTable, Release};
pub use nfqueue::NfQueueConnector;
pub use runner::{QueueProcessor, QueueRunner};
