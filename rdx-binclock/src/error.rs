//! The error type shared by every fallible Binclock operation.

use crate::registry::DisplayId;
use thiserror::Error;

/// Everything that can go wrong inside the Binclock core.
///
/// Each failure has its own variant, so a legitimately zero value is never
/// confused with an error and a broken system clock is never confused with a
/// caller passing `25:00:00`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// A bit width outside `1..=6` was requested.
    #[error("bit count {0} out of valid range (1-6)")]
    InvalidBitCount(u8),

    /// Time components outside the 24h/60m/60s domain.
    #[error("invalid time components {hours:02}:{minutes:02}:{seconds:02}")]
    InvalidTime { hours: u8, minutes: u8, seconds: u8 },

    /// The clock source could not produce a reading.
    #[error("system time retrieval failed: {0}")]
    SystemTime(String),

    /// Text that was expected to hold a time or a display mode did not parse.
    #[error("could not parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    /// Every registry slot is taken.
    #[error("display registry is full ({capacity} displays)")]
    RegistryFull { capacity: usize },

    /// No active display carries this id, either because it was never
    /// registered or because it has already been removed.
    #[error("no active display with id {0}")]
    UnknownDisplay(DisplayId),
}

/// Shorthand result type for the Binclock core.
pub type Result<T> = std::result::Result<T, ClockError>;
