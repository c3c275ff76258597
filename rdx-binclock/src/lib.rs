//! # Binclock
//!
//! A binary-coded-decimal clock for Rust.
//!
//! Binclock turns a time of day into six fixed-width binary digits (tens and
//! units for hours, minutes and seconds) and fans each snapshot out to any
//! number of independent displays.
//!
//! ## Core Concepts
//!
//! - **BinaryDigit**: one decimal digit as an MSB-first bit array. Tens digits
//!   are 3 bits wide, units digits 4.
//! - **ClockState**: an immutable snapshot of the six digits plus the Unix
//!   time it was captured at.
//! - **ClockSource**: where the current time comes from. `SystemClock` reads
//!   the local wall clock; `FixedClock` always returns the same reading.
//! - **DisplayRegistry**: a capped set of `Renderer`s. Dispatching a state
//!   hands it to every registered renderer once, in registration order.
//! - **ClockEngine**: an async loop that redraws the registry on an interval.
//!
//! ## Example Usage
//!
//! ```rust
//! use binclock::prelude::*;
//!
//! fn main() -> Result<(), ClockError> {
//!     let time: TimeComponents = "14:30:45".parse()?;
//!     let state = decompose_time(&time)?;
//!
//!     let mut registry = DisplayRegistry::new();
//!     registry.register(|state: &ClockState| println!("{}", state.time_string()))?;
//!     registry.register(CompactRenderer::stdout())?;
//!     registry.dispatch(&state);
//!     Ok(())
//! }
//! ```

pub const CLOCK_NAME: &str = "Binary Clock";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod binary;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod registry;
pub mod render;
pub mod state;
pub mod time;

/// A prelude module for easy importing of the most common Binclock types.
pub mod prelude {
    pub use crate::binary::{convert_from_binary, convert_to_binary, BinaryDigit};
    pub use crate::config::BinclockConfig;
    pub use crate::engine::ClockEngine;
    pub use crate::error::ClockError;
    pub use crate::events::ClockEvent;
    pub use crate::registry::{DisplayId, DisplayRegistry, Renderer};
    pub use crate::render::{
        AsciiRenderer, ClearScreen, CompactRenderer, DisplayMode, EmojiRenderer, JsonRenderer,
        PipeWatch, RawRenderer,
    };
    pub use crate::state::{decompose_time, get_current_state, BinaryClock, ClockState};
    pub use crate::time::{ClockSource, FixedClock, SystemClock, TimeComponents};
}
