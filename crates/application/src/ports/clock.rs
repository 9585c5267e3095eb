use chrono::{DateTime, Utc};

/// Wall-clock source for mapping expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
