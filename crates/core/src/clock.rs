//! # Clock Module
//!
//! Injectable wall-clock. Decision and attendance logic never read the
//! system clock directly; they receive an instant from a [`Clock`].

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::sync::Mutex;

/// Source of the current local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Current instant split for rule evaluation
    fn instant(&self) -> EvalInstant {
        EvalInstant::from_datetime(self.now())
    }
}

/// Local system time, no timezone normalization.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock fixed at `date` `hh:mm:ss`; `None` for an invalid date or time
    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, min, sec))
            .map(Self::new)
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += delta;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// An evaluation instant: local date, time of day and ISO weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalInstant {
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// 1 = Monday .. 7 = Sunday
    pub weekday: u8,
}

impl EvalInstant {
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        Self {
            date: at.date(),
            time: at.time(),
            weekday: at.weekday().number_from_monday() as u8,
        }
    }
}
