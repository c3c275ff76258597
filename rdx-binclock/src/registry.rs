//! The display registry: a capped table of renderers that a single clock
//! state is fanned out to.

use crate::error::{ClockError, Result};
use crate::state::{BinaryClock, ClockState};
use crate::time::ClockSource;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// How many displays a registry holds unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 16;

/// Identifies a registered display.
///
/// Ids come from a counter that only moves forward, so an id is never handed
/// out twice by the same registry, even after the display it named is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub u64);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that draws a `ClockState`.
///
/// Renderers receive the state by shared reference and must not assume they
/// run before or after any other renderer. Any closure taking a
/// `&ClockState` is a renderer.
pub trait Renderer: Send {
    fn render(&mut self, state: &ClockState);
}

impl<F> Renderer for F
where
    F: FnMut(&ClockState) + Send,
{
    fn render(&mut self, state: &ClockState) {
        self(state)
    }
}

/// A capped set of renderers.
///
/// Dispatch visits renderers in registration order (ascending id).
pub struct DisplayRegistry {
    capacity: usize,
    next_id: u64,
    displays: BTreeMap<DisplayId, Box<dyn Renderer>>,
}

impl DisplayRegistry {
    /// An empty registry with room for [`DEFAULT_CAPACITY`] displays.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            next_id: 0,
            displays: BTreeMap::new(),
        }
    }

    /// Adds a renderer and returns its id.
    ///
    /// Fails with [`ClockError::RegistryFull`] when every slot is taken, in
    /// which case the registry is left untouched.
    pub fn register(&mut self, renderer: impl Renderer + 'static) -> Result<DisplayId> {
        self.register_boxed(Box::new(renderer))
    }

    pub fn register_boxed(&mut self, renderer: Box<dyn Renderer>) -> Result<DisplayId> {
        if self.displays.len() >= self.capacity {
            return Err(ClockError::RegistryFull {
                capacity: self.capacity,
            });
        }
        let id = DisplayId(self.next_id);
        self.next_id += 1;
        self.displays.insert(id, renderer);
        debug!("Registered display {} ({}/{})", id, self.len(), self.capacity);
        Ok(id)
    }

    /// Removes a display. Unknown and already-removed ids are the same error.
    pub fn unregister(&mut self, id: DisplayId) -> Result<()> {
        match self.displays.remove(&id) {
            Some(_) => {
                debug!("Unregistered display {}", id);
                Ok(())
            }
            None => Err(ClockError::UnknownDisplay(id)),
        }
    }

    /// Hands `state` to every registered renderer exactly once and returns
    /// how many were called.
    pub fn dispatch(&mut self, state: &ClockState) -> usize {
        trace!(
            "Dispatching {} to {} display(s)",
            state,
            self.displays.len()
        );
        for renderer in self.displays.values_mut() {
            renderer.render(state);
        }
        self.displays.len()
    }

    /// Takes the current state from `clock` and dispatches it. When the clock
    /// fails nothing is rendered and the error is returned.
    pub fn dispatch_current<C: ClockSource>(&mut self, clock: &BinaryClock<C>) -> Result<usize> {
        let state = clock.current_state()?;
        Ok(self.dispatch(&state))
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, id: DisplayId) -> bool {
        self.displays.contains_key(&id)
    }

    /// Ids of the active displays, in dispatch order.
    pub fn ids(&self) -> Vec<DisplayId> {
        self.displays.keys().copied().collect()
    }
}

impl Default for DisplayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DisplayRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayRegistry")
            .field("capacity", &self.capacity)
            .field("next_id", &self.next_id)
            .field("displays", &self.ids())
            .finish()
    }
}
