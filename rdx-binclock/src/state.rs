//! The clock state snapshot and the decomposer that produces it.

use crate::binary::{convert_to_binary, BinaryDigit};
use crate::error::Result;
use crate::time::{ClockSource, SystemClock, TimeComponents};
use serde::{Serialize, Serializer};
use std::fmt;

/// Width of every tens digit. Hours tens never exceed 2 and minute/second
/// tens never exceed 5, so three bits cover all of them.
pub const TENS_BITS: u8 = 3;

/// Width of every units digit (0-9).
pub const UNITS_BITS: u8 = 4;

/// A binary-coded-decimal snapshot of one time of day.
///
/// A `ClockState` is only produced from validated input, so every digit is
/// inside its per-field domain. It is `Copy`: each caller and each renderer
/// works on its own value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    hours_tens: BinaryDigit,
    hours_units: BinaryDigit,
    minutes_tens: BinaryDigit,
    minutes_units: BinaryDigit,
    seconds_tens: BinaryDigit,
    seconds_units: BinaryDigit,
    timestamp: i64,
}

impl ClockState {
    /// Splits `time` into tens/units digits and stamps the result with
    /// `timestamp`.
    pub fn decompose(time: &TimeComponents, timestamp: i64) -> Result<Self> {
        time.validate()?;
        Ok(Self {
            hours_tens: convert_to_binary(time.hours / 10, TENS_BITS)?,
            hours_units: convert_to_binary(time.hours % 10, UNITS_BITS)?,
            minutes_tens: convert_to_binary(time.minutes / 10, TENS_BITS)?,
            minutes_units: convert_to_binary(time.minutes % 10, UNITS_BITS)?,
            seconds_tens: convert_to_binary(time.seconds / 10, TENS_BITS)?,
            seconds_units: convert_to_binary(time.seconds % 10, UNITS_BITS)?,
            timestamp,
        })
    }

    pub fn hours_tens(&self) -> BinaryDigit {
        self.hours_tens
    }

    pub fn hours_units(&self) -> BinaryDigit {
        self.hours_units
    }

    pub fn minutes_tens(&self) -> BinaryDigit {
        self.minutes_tens
    }

    pub fn minutes_units(&self) -> BinaryDigit {
        self.minutes_units
    }

    pub fn seconds_tens(&self) -> BinaryDigit {
        self.seconds_tens
    }

    pub fn seconds_units(&self) -> BinaryDigit {
        self.seconds_units
    }

    /// Unix time, in seconds, at which the snapshot was taken. This is when
    /// the conversion ran, not the time of day the digits encode.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn hours(&self) -> u8 {
        self.hours_tens.decimal_value() * 10 + self.hours_units.decimal_value()
    }

    pub fn minutes(&self) -> u8 {
        self.minutes_tens.decimal_value() * 10 + self.minutes_units.decimal_value()
    }

    pub fn seconds(&self) -> u8 {
        self.seconds_tens.decimal_value() * 10 + self.seconds_units.decimal_value()
    }

    /// The time of day encoded by the digits.
    pub fn time_components(&self) -> TimeComponents {
        TimeComponents::new(self.hours(), self.minutes(), self.seconds())
    }

    /// `HH:MM:SS`, zero padded.
    pub fn time_string(&self) -> String {
        self.time_components().to_string()
    }

    /// `(label, tens, units)` for hours, minutes and seconds, in that order.
    pub fn rows(&self) -> [(&'static str, BinaryDigit, BinaryDigit); 3] {
        [
            ("Hours", self.hours_tens, self.hours_units),
            ("Minutes", self.minutes_tens, self.minutes_units),
            ("Seconds", self.seconds_tens, self.seconds_units),
        ]
    }

    /// A serializable view matching the JSON display contract.
    pub fn json_document(&self) -> JsonDocument<'_> {
        JsonDocument {
            timestamp: self.timestamp,
            time: self.time_string(),
            binary: JsonBinary {
                hours: JsonPair {
                    tens: BitArray(&self.hours_tens),
                    units: BitArray(&self.hours_units),
                },
                minutes: JsonPair {
                    tens: BitArray(&self.minutes_tens),
                    units: BitArray(&self.minutes_units),
                },
                seconds: JsonPair {
                    tens: BitArray(&self.seconds_tens),
                    units: BitArray(&self.seconds_units),
                },
            },
        }
    }

    /// The JSON document on a single line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.json_document())
    }
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.time_components(), f)
    }
}

/// Top level of the JSON display contract. Field order is part of the format.
#[derive(Debug, Serialize)]
pub struct JsonDocument<'a> {
    pub timestamp: i64,
    pub time: String,
    pub binary: JsonBinary<'a>,
}

#[derive(Debug, Serialize)]
pub struct JsonBinary<'a> {
    pub hours: JsonPair<'a>,
    pub minutes: JsonPair<'a>,
    pub seconds: JsonPair<'a>,
}

#[derive(Debug, Serialize)]
pub struct JsonPair<'a> {
    pub tens: BitArray<'a>,
    pub units: BitArray<'a>,
}

/// Serializes a digit as an array of 0/1 integers, MSB first.
#[derive(Debug)]
pub struct BitArray<'a>(pub &'a BinaryDigit);

impl Serialize for BitArray<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.bit_values())
    }
}

/// Turns times into `ClockState`s, stamping each one with a reading from its
/// clock source.
#[derive(Debug, Clone, Default)]
pub struct BinaryClock<C = SystemClock> {
    source: C,
}

impl BinaryClock<SystemClock> {
    /// A decomposer backed by the local wall clock.
    pub fn system() -> Self {
        Self::new(SystemClock::new())
    }
}

impl<C: ClockSource> BinaryClock<C> {
    pub fn new(source: C) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    /// Decomposes an arbitrary time. The timestamp is taken from the clock
    /// source when the conversion runs.
    pub fn decompose_time(&self, time: &TimeComponents) -> Result<ClockState> {
        time.validate()?;
        let reading = self.source.now()?;
        ClockState::decompose(time, reading.timestamp)
    }

    /// Reads the clock source and decomposes the current time.
    pub fn current_state(&self) -> Result<ClockState> {
        let reading = self.source.now()?;
        ClockState::decompose(&reading.components, reading.timestamp)
    }
}

/// Decomposes `time`, stamped with the local wall clock.
pub fn decompose_time(time: &TimeComponents) -> Result<ClockState> {
    BinaryClock::system().decompose_time(time)
}

/// The current local time as a `ClockState`.
pub fn get_current_state() -> Result<ClockState> {
    BinaryClock::system().current_state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClockError;
    use crate::time::{FixedClock, TimeReading};

    struct BrokenClock;

    impl ClockSource for BrokenClock {
        fn now(&self) -> Result<TimeReading> {
            Err(ClockError::SystemTime("no clock".to_string()))
        }
    }

    fn bits(digit: BinaryDigit) -> Vec<u8> {
        digit.bit_values().collect()
    }

    #[test]
    fn test_decompose_afternoon() {
        let state = ClockState::decompose(&TimeComponents::new(14, 30, 45), 1).unwrap();

        assert_eq!(state.hours_tens().decimal_value(), 1);
        assert_eq!(bits(state.hours_tens()), vec![0, 0, 1]);
        assert_eq!(state.hours_units().decimal_value(), 4);
        assert_eq!(bits(state.hours_units()), vec![0, 1, 0, 0]);
        assert_eq!(state.minutes_tens().decimal_value(), 3);
        assert_eq!(bits(state.minutes_tens()), vec![0, 1, 1]);
        assert_eq!(state.minutes_units().decimal_value(), 0);
        assert_eq!(bits(state.minutes_units()), vec![0, 0, 0, 0]);
        assert_eq!(state.seconds_tens().decimal_value(), 4);
        assert_eq!(bits(state.seconds_tens()), vec![1, 0, 0]);
        assert_eq!(state.seconds_units().decimal_value(), 5);
        assert_eq!(bits(state.seconds_units()), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_decompose_midnight_is_all_clear() {
        let state = ClockState::decompose(&TimeComponents::new(0, 0, 0), 1).unwrap();
        for (_, tens, units) in state.rows() {
            assert_eq!(tens.decimal_value(), 0);
            assert_eq!(units.decimal_value(), 0);
            assert!(tens.bits().iter().chain(units.bits()).all(|bit| !bit));
        }
    }

    #[test]
    fn test_decompose_last_second_of_day() {
        let state = ClockState::decompose(&TimeComponents::new(23, 59, 59), 1).unwrap();
        assert_eq!(state.hours_tens().decimal_value(), 2);
        assert_eq!(state.hours_units().decimal_value(), 3);
        assert_eq!(state.minutes_tens().decimal_value(), 5);
        assert_eq!(state.minutes_units().decimal_value(), 9);
        assert_eq!(state.seconds_tens().decimal_value(), 5);
        assert_eq!(state.seconds_units().decimal_value(), 9);
        assert_eq!(state.time_string(), "23:59:59");
    }

    #[test]
    fn test_digit_domains_hold_for_every_valid_time() {
        for hours in 0..24 {
            for minutes in 0..60 {
                for seconds in 0..60 {
                    let time = TimeComponents::new(hours, minutes, seconds);
                    let state = ClockState::decompose(&time, 1).unwrap();
                    assert!(state.hours_tens().decimal_value() <= 2);
                    assert!(state.hours_units().decimal_value() <= 9);
                    assert!(state.minutes_tens().decimal_value() <= 5);
                    assert!(state.minutes_units().decimal_value() <= 9);
                    assert!(state.seconds_tens().decimal_value() <= 5);
                    assert!(state.seconds_units().decimal_value() <= 9);
                    assert_eq!(state.time_components(), time);
                }
            }
        }
    }

    #[test]
    fn test_bit_widths_are_fixed() {
        let state = ClockState::decompose(&TimeComponents::new(9, 9, 9), 1).unwrap();
        for (_, tens, units) in state.rows() {
            assert_eq!(tens.bit_count(), TENS_BITS);
            assert_eq!(units.bit_count(), UNITS_BITS);
        }
    }

    #[test]
    fn test_invalid_times_are_rejected() {
        for time in [
            TimeComponents::new(24, 0, 0),
            TimeComponents::new(0, 60, 0),
            TimeComponents::new(0, 0, 60),
        ] {
            assert!(matches!(
                ClockState::decompose(&time, 1),
                Err(ClockError::InvalidTime { .. })
            ));
        }
    }

    #[test]
    fn test_decompose_time_uses_capture_timestamp() {
        let clock = BinaryClock::new(FixedClock::new(TimeComponents::new(8, 0, 0), 1_700_000_000));
        let state = clock
            .decompose_time(&TimeComponents::new(14, 30, 45))
            .unwrap();
        assert_eq!(state.timestamp(), 1_700_000_000);
        assert_eq!(state.time_string(), "14:30:45");
    }

    #[test]
    fn test_current_state_reads_the_source() {
        let clock = BinaryClock::new(FixedClock::new(TimeComponents::new(8, 15, 0), 99));
        let state = clock.current_state().unwrap();
        assert_eq!(state.time_string(), "08:15:00");
        assert_eq!(state.timestamp(), 99);
    }

    #[test]
    fn test_clock_failure_is_not_a_validation_failure() {
        let clock = BinaryClock::new(BrokenClock);
        assert!(matches!(
            clock.current_state(),
            Err(ClockError::SystemTime(_))
        ));
        assert!(matches!(
            clock.decompose_time(&TimeComponents::new(24, 0, 0)),
            Err(ClockError::InvalidTime { .. })
        ));
    }

    #[test]
    fn test_compact_json() {
        let state = ClockState::decompose(&TimeComponents::new(14, 30, 45), 7).unwrap();
        assert_eq!(
            state.to_json().unwrap(),
            concat!(
                r#"{"timestamp":7,"time":"14:30:45","binary":{"#,
                r#""hours":{"tens":[0,0,1],"units":[0,1,0,0]},"#,
                r#""minutes":{"tens":[0,1,1],"units":[0,0,0,0]},"#,
                r#""seconds":{"tens":[1,0,0],"units":[0,1,0,1]}}}"#
            )
        );
    }

    #[test]
    fn test_system_state_is_stamped() {
        let state = get_current_state().unwrap();
        assert!(state.timestamp() > 0);
    }
}
