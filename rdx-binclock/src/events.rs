//! Events broadcast by the `ClockEngine`.

use crate::error::ClockError;
use crate::registry::DisplayId;
use crate::state::ClockState;
use tokio::time::Instant;

/// Lifecycle and dispatch notifications from a running engine.
#[derive(Debug, Clone)]
pub enum ClockEvent {
    /// Fired once when the engine's run loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired after a state has been handed to every display.
    Tick { state: ClockState, displays: usize },
    /// The clock source failed, so nothing was rendered this tick.
    TickFailed { reason: ClockError },
    /// Fired when a display is registered.
    DisplayAdded { id: DisplayId },
    /// Fired when a display is removed.
    DisplayRemoved { id: DisplayId },
    /// Fired once when the run loop is about to exit.
    EngineShutdown,
}
