pub mod dns_wire;
pub mod mock_ports;
pub mod mock_queue;
pub mod packets;
pub mod pipeline;

#[allow(unused_imports)]
pub use dns_wire::*;
#[allow(unused_imports)]
pub use mock_ports::*;
#[allow(unused_imports)]
pub use mock_queue::*;
#[allow(unused_imports)]
pub use packets::*;
#[allow(unused_imports)]
pub use pipeline::*;
