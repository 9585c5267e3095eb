pub mod trust_filter;

pub use trust_filter::{TrustDecision, TrustFilter, UntrustedReason};
