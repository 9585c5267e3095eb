pub mod reload_policy;

pub use reload_policy::{ReloadOutcome, ReloadPolicyUseCase};
