mod queues;
mod signals;

pub use queues::spawn_queue_runners;
pub use signals::{reload_on_hangup, shutdown_signal};
