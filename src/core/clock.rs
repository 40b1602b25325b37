//! Wall clock access and the time formats used on screen and on disk

use chrono::{DateTime, Local};

/// Source of the current local time
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The system clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Long time, e.g. `3:04:05 PM`
pub fn long_time(t: &DateTime<Local>) -> String {
    t.format("%-I:%M:%S %p").to_string()
}

/// Short date, e.g. `10/17/2026`
pub fn short_date(t: &DateTime<Local>) -> String {
    t.format("%-m/%-d/%Y").to_string()
}

/// Date and long time, e.g. `10/17/2026 3:04:05 PM`
pub fn general_date_time(t: &DateTime<Local>) -> String {
    format!("{} {}", short_date(t), long_time(t))
}
