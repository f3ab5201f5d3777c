//! Wall-clock port trait.

use chrono::NaiveDate;

pub trait ClockPort {
    fn today(&self) -> NaiveDate;
}
