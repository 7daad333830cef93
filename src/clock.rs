//! Time source for request handling

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

pub trait Clock: Send + Sync {
    /// Instant used for persisted timestamps
    fn now(&self) -> DateTime<Utc>;

    /// Wall-clock time used for due-date comparisons
    fn local_now(&self) -> NaiveDateTime {
        self.now().with_timezone(&Local).naive_local()
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen clock whose local time equals its UTC time
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    fn local_now(&self) -> NaiveDateTime {
        self.0.naive_utc()
    }
}
