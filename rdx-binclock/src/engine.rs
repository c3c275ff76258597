//! The engine that keeps a set of displays up to date.

use crate::config::BinclockConfig;
use crate::error::Result;
use crate::events::ClockEvent;
use crate::registry::{DisplayId, DisplayRegistry, Renderer};
use crate::state::{BinaryClock, ClockState};
use crate::time::{ClockSource, SystemClock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, trace};

const EVENT_CAPACITY: usize = 64;

/// Drives a `DisplayRegistry` from a clock source.
///
/// The engine is a cheap handle over shared state: clone it to add or remove
/// displays from one task while another runs the loop.
pub struct ClockEngine<C = SystemClock> {
    interval: Duration,
    clock: Arc<BinaryClock<C>>,
    registry: Arc<Mutex<DisplayRegistry>>,
    event_sender: broadcast::Sender<ClockEvent>,
}

impl<C> Clone for ClockEngine<C> {
    fn clone(&self) -> Self {
        Self {
            interval: self.interval,
            clock: self.clock.clone(),
            registry: self.registry.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}

impl ClockEngine<SystemClock> {
    /// Creates an engine reading the local wall clock.
    pub fn new(config: &BinclockConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C> ClockEngine<C>
where
    C: ClockSource + Send + Sync + 'static,
{
    pub fn with_clock(config: &BinclockConfig, source: C) -> Self {
        let (event_sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            interval: config.interval(),
            clock: Arc::new(BinaryClock::new(source)),
            registry: Arc::new(Mutex::new(DisplayRegistry::with_capacity(config.capacity))),
            event_sender,
        }
    }

    /// The decomposer this engine reads from.
    pub fn clock(&self) -> &BinaryClock<C> {
        &self.clock
    }

    /// Registers a display. It is drawn on every tick from now on.
    pub async fn add_display(&self, renderer: impl Renderer + 'static) -> Result<DisplayId> {
        self.add_boxed_display(Box::new(renderer)).await
    }

    pub async fn add_boxed_display(&self, renderer: Box<dyn Renderer>) -> Result<DisplayId> {
        let id = self.registry.lock().await.register_boxed(renderer)?;
        self.event_sender
            .send(ClockEvent::DisplayAdded { id })
            .ok();
        Ok(id)
    }

    /// Removes a display.
    pub async fn remove_display(&self, id: DisplayId) -> Result<()> {
        self.registry.lock().await.unregister(id)?;
        self.event_sender
            .send(ClockEvent::DisplayRemoved { id })
            .ok();
        Ok(())
    }

    /// Ids of the registered displays, in draw order.
    pub async fn display_ids(&self) -> Vec<DisplayId> {
        self.registry.lock().await.ids()
    }

    /// Draws `state` on every display without consulting the clock.
    pub async fn dispatch_state(&self, state: &ClockState) -> usize {
        let displays = self.registry.lock().await.dispatch(state);
        self.event_sender
            .send(ClockEvent::Tick {
                state: *state,
                displays,
            })
            .ok();
        displays
    }

    /// Reads the clock once and draws the result on every display.
    pub async fn tick(&self) -> Result<usize> {
        match self.clock.current_state() {
            Ok(state) => Ok(self.dispatch_state(&state).await),
            Err(reason) => {
                self.event_sender
                    .send(ClockEvent::TickFailed {
                        reason: reason.clone(),
                    })
                    .ok();
                Err(reason)
            }
        }
    }

    /// Ticks once per interval until `shutdown` resolves.
    pub async fn run_until<F: Future>(&self, shutdown: F) {
        info!("ClockEngine starting up...");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.event_sender
            .send(ClockEvent::EngineStarted {
                timestamp: Instant::now(),
            })
            .ok();

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(displays) => trace!("Tick drew {} display(s).", displays),
                        Err(e) => error!("Tick failed: {}", e),
                    }
                }
            }
        }

        self.event_sender.send(ClockEvent::EngineShutdown).ok();
        info!("ClockEngine has shut down.");
    }

    /// Runs until Ctrl+C.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.run_with(std::future::pending::<()>()).await
    }

    /// Runs until Ctrl+C or until `stop` resolves, whichever comes first.
    pub async fn run_with<F: Future>(&self, stop: F) -> anyhow::Result<()> {
        info!(
            "Engine running every {:?}. Press Ctrl+C to shut down.",
            self.interval
        );
        let mut signal_error = None;
        self.run_until(async {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        signal_error = Some(e);
                    }
                }
                _ = stop => info!("Stop requested."),
            }
        })
        .await;

        match signal_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Subscribes to engine events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClockEvent> {
        self.event_sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClockError;
    use crate::render::{JsonRenderer, PipeWatch};
    use crate::time::{FixedClock, TimeComponents};
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn fixed_engine(capacity: usize) -> ClockEngine<FixedClock> {
        let config = BinclockConfig {
            capacity,
            ..Default::default()
        };
        ClockEngine::with_clock(
            &config,
            FixedClock::new(TimeComponents::new(14, 30, 45), 1_700_000_000),
        )
    }

    #[tokio::test]
    async fn test_add_and_remove_emit_events() {
        let engine = fixed_engine(4);
        let mut events = engine.subscribe_events();

        let id = engine.add_display(|_: &ClockState| {}).await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            ClockEvent::DisplayAdded { id: added } if added == id
        ));

        engine.remove_display(id).await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            ClockEvent::DisplayRemoved { id: removed } if removed == id
        ));

        assert_eq!(
            engine.remove_display(id).await,
            Err(ClockError::UnknownDisplay(id))
        );
    }

    #[tokio::test]
    async fn test_tick_draws_every_display() {
        let engine = fixed_engine(4);
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            engine
                .add_display(move |state: &ClockState| {
                    assert_eq!(state.time_string(), "14:30:45");
                    calls.fetch_add(1, Ordering::Relaxed);
                })
                .await
                .unwrap();
        }

        let mut events = engine.subscribe_events();
        assert_eq!(engine.tick().await, Ok(3));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert!(matches!(
            events.recv().await.unwrap(),
            ClockEvent::Tick { displays: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_capacity_comes_from_config() {
        let engine = fixed_engine(1);
        engine.add_display(|_: &ClockState| {}).await.unwrap();
        assert!(matches!(
            engine.add_display(|_: &ClockState| {}).await,
            Err(ClockError::RegistryFull { capacity: 1 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_ticks_each_interval() {
        let engine = fixed_engine(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        engine
            .add_display(move |_: &ClockState| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .await
            .unwrap();

        let mut events = engine.subscribe_events();
        engine
            .run_until(tokio::time::sleep(Duration::from_millis(3500)))
            .await;

        // Ticks at 0s, 1s, 2s and 3s.
        assert_eq!(calls.load(Ordering::Relaxed), 4);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.len(), 6);
        assert!(matches!(seen[0], ClockEvent::EngineStarted { .. }));
        assert!(seen[1..5]
            .iter()
            .all(|event| matches!(event, ClockEvent::Tick { displays: 1, .. })));
        assert!(matches!(seen[5], ClockEvent::EngineShutdown));
    }

    struct HungUp;

    impl Write for HungUp {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_stops_when_output_closes() {
        let engine = fixed_engine(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        engine
            .add_display(move |_: &ClockState| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .await
            .unwrap();

        let closed = Arc::new(Notify::new());
        engine
            .add_display(JsonRenderer::new(PipeWatch::new(HungUp, closed.clone())))
            .await
            .unwrap();

        engine.run_with(closed.notified()).await.unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
