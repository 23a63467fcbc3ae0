//! Wall-clock implementation of `ClockPort`.

use chrono::{DateTime, Utc};

use crate::ports::ClockPort;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
