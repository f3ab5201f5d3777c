//! Wall-clock adapter.

use crate::ports::clock_port::ClockPort;
use chrono::{NaiveDate, Utc};

/// Calendar days follow UTC, matching the daily market-cap candles.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
