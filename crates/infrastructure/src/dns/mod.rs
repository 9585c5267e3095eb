pub mod decoder;
pub mod packet;

pub use decoder::HickoryDnsDecoder;
pub use packet::{destination_ip, dissect, Dissected};
