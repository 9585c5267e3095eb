use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Next delay with up to 50% jitter added, then doubles the base.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let base = self.current.as_millis() as u64;
        let jitter = fastrand::u64(0..=base / 2);
        self.current = (self.current * 2).min(self.max);
        Duration::from_millis(base + jitter).min(self.max)
    }
}
