//! Wall clock.

use shared_types::{settime_now, timestamp_now};

use crate::ports::Clock;

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn settime(&self) -> String {
        settime_now()
    }

    fn timestamp(&self) -> String {
        timestamp_now()
    }
}
