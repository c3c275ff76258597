//! Time-of-day input and the clock sources that produce it.
//!
//! The core never talks to the operating system directly. It asks a
//! [`ClockSource`] for a [`TimeReading`], which keeps decomposition testable
//! and lets callers plug in any time they like.

use crate::error::{ClockError, Result};
use chrono::{Local, Timelike};
use std::fmt;
use std::str::FromStr;

/// An hours/minutes/seconds triple in 24-hour format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeComponents {
    /// 0-23
    pub hours: u8,
    /// 0-59
    pub minutes: u8,
    /// 0-59
    pub seconds: u8,
}

impl TimeComponents {
    pub fn new(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Checks that every field is inside its 24h/60m/60s domain.
    pub fn validate(&self) -> Result<()> {
        if self.hours > 23 || self.minutes > 59 || self.seconds > 59 {
            return Err(ClockError::InvalidTime {
                hours: self.hours,
                minutes: self.minutes,
                seconds: self.seconds,
            });
        }
        Ok(())
    }
}

impl fmt::Display for TimeComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// Parses `HH:MM:SS` or `HH:MM` (seconds default to zero).
impl FromStr for TimeComponents {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self> {
        let parse_error = |reason: &str| ClockError::Parse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let fields = s
            .trim()
            .split(':')
            .map(|part| {
                if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                part.parse::<u8>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| parse_error("fields must be one or two digits"))?;

        let time = match fields.as_slice() {
            [hours, minutes] => Self::new(*hours, *minutes, 0),
            [hours, minutes, seconds] => Self::new(*hours, *minutes, *seconds),
            _ => return Err(parse_error("expected HH:MM or HH:MM:SS")),
        };
        time.validate()?;
        Ok(time)
    }
}

/// One read of a clock source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReading {
    /// The local time of day.
    pub components: TimeComponents,
    /// Unix timestamp of the reading, in seconds.
    pub timestamp: i64,
}

/// Anything that can tell the current time of day.
pub trait ClockSource {
    /// Reads the clock.
    fn now(&self) -> Result<TimeReading>;
}

/// The local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> Result<TimeReading> {
        let now = Local::now();
        let timestamp = now.timestamp();
        if timestamp <= 0 {
            return Err(ClockError::SystemTime(format!(
                "clock reports {timestamp}, at or before the Unix epoch"
            )));
        }

        // chrono folds leap seconds into the nanosecond field, so `second()`
        // stays within 0..=59.
        let components = TimeComponents::new(
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
        );
        Ok(TimeReading {
            components,
            timestamp,
        })
    }
}

/// A clock that always returns the same reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    reading: TimeReading,
}

impl FixedClock {
    pub fn new(components: TimeComponents, timestamp: i64) -> Self {
        Self {
            reading: TimeReading {
                components,
                timestamp,
            },
        }
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> Result<TimeReading> {
        Ok(self.reading)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now(&self) -> Result<TimeReading> {
        (**self).now()
    }
}
