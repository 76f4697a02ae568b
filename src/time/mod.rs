//! Simulated time, so that tasks can model slow critical sections without real delays

pub mod timer;
pub use timer::{SleepFut, Timer};

mod primitives;
pub use primitives::{Duration, Time, START_TIME};

/// Make this task wait for the specified duration
pub fn sleep(duration: Duration) -> SleepFut {
    crate::get_runtime().get_timer().sleep_for(duration)
}

/// Get the current simulated time
pub fn now() -> Time {
    crate::get_runtime().get_timer().now()
}
