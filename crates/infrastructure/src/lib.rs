//! domainwall adapters: DNS decoding, mapping store, membership projection and packet queues
mod backoff;
pub mod dns;
pub mod mapping;
pub mod membership;
pub mod queue;
pub mod system;
