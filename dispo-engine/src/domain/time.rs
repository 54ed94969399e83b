//! Timetable times as integer seconds.
//!
//! The input tables give event times as whole seconds from the start of the
//! operating day, and every duration the engine reasons about is a difference
//! of two such times. An [`EventTime`] is therefore a thin wrapper around
//! `i64` seconds with ordering and offset arithmetic; there is deliberately
//! no calendar attached.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Which of the two timetables a query refers to.
///
/// Every event carries both its scheduled time and its disposition (actual,
/// possibly delayed) time. Checks and path searches run against one view or
/// the other; the algorithms are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeView {
    /// The published timetable.
    Scheduled,
    /// The disposition timetable computed by the upstream re-timetabling
    /// step.
    Disposition,
}

/// A point in time, in seconds from the start of the operating day.
///
/// # Examples
///
/// ```
/// use dispo_engine::domain::EventTime;
///
/// let dep = EventTime::new(600);
/// let arr = EventTime::new(720);
/// assert_eq!(arr - dep, 120);
/// assert_eq!(dep + 60, EventTime::new(660));
/// assert!(dep < arr);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventTime(i64);

impl EventTime {
    /// The latest representable time, useful as an "unbounded" sentinel.
    pub const MAX: EventTime = EventTime(i64::MAX);

    /// Creates a time from seconds since start of day.
    pub const fn new(seconds: i64) -> Self {
        EventTime(seconds)
    }

    /// Returns the time as seconds since start of day.
    pub const fn seconds(self) -> i64 {
        self.0
    }

    /// Returns this time shifted by the given number of seconds.
    pub fn offset(self, seconds: i64) -> Self {
        EventTime(self.0 + seconds)
    }
}

impl Add<i64> for EventTime {
    type Output = EventTime;

    fn add(self, rhs: i64) -> EventTime {
        self.offset(rhs)
    }
}

impl Sub for EventTime {
    /// The duration between two times, in seconds. Negative if `rhs` is
    /// later than `self`.
    type Output = i64;

    fn sub(self, rhs: EventTime) -> i64 {
        self.0 - rhs.0
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventTime({})", self.0)
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The duration of a periodic activity spanning two times in one period.
///
/// In a periodic network the raw difference `end - start` may be negative or
/// shorter than the activity's minimum duration because both times are only
/// known modulo the period length. The actual duration is the smallest value
/// that is at least `lower_bound` and congruent to `end - start` modulo
/// `period`.
///
/// # Examples
///
/// ```
/// use dispo_engine::domain::{EventTime, periodic_duration};
///
/// // Raw difference is 2 - 10 = -8; the smallest value >= 5 congruent to
/// // -8 mod 60 is 52.
/// let d = periodic_duration(EventTime::new(10), EventTime::new(2), 5, 60);
/// assert_eq!(d, 52);
/// ```
///
/// # Panics
///
/// Panics if `period` is not strictly positive.
pub fn periodic_duration(start: EventTime, end: EventTime, lower_bound: i64, period: i64) -> i64 {
    assert!(period > 0, "period length must be positive");
    let mut duration = (end - start).rem_euclid(period);
    while duration < lower_bound {
        duration += period;
    }
    duration
}
