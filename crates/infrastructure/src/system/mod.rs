pub mod clock;
pub mod conntrack;

pub use clock::SystemClock;
pub use conntrack::ProcConntrackReader;
