//! Cancellable repeating trigger driving the periodic flush.

use crate::domain::ShipperError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

type EventHandler = Arc<dyn Fn() + Send + Sync>;
type CancelHandler = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Suspended,
    Running,
}

/// Invokes an event handler every `interval` while running.
///
/// `run` and `suspend` are no-ops when the timer is already in the target
/// state. A timer starts suspended. Dropping it clears the event handler,
/// forces it into the running state, stops it and calls the cancel handler
/// once.
pub struct RepeatingTimer {
    interval: Duration,
    state: Mutex<TimerState>,
    running: watch::Sender<bool>,
    event_handler: Arc<Mutex<Option<EventHandler>>>,
    cancel_handler: Mutex<Option<CancelHandler>>,
    shutdown: CancellationToken,
}

impl RepeatingTimer {
    /// Spawns the timer task on the current Tokio runtime.
    pub fn new(interval: Duration) -> Result<Self, ShipperError> {
        let handle = Handle::try_current().map_err(|e| ShipperError::Runtime(e.to_string()))?;

        let (running, running_rx) = watch::channel(false);
        let event_handler: Arc<Mutex<Option<EventHandler>>> = Arc::new(Mutex::new(None));
        let shutdown = CancellationToken::new();

        handle.spawn(drive(
            interval,
            running_rx,
            event_handler.clone(),
            shutdown.clone(),
        ));

        Ok(Self {
            interval,
            state: Mutex::new(TimerState::Suspended),
            running,
            event_handler,
            cancel_handler: Mutex::new(None),
            shutdown,
        })
    }

    pub fn set_event_handler(&self, handler: impl Fn() + Send + Sync + 'static) {
        *self.event_handler.lock() = Some(Arc::new(handler));
    }

    pub fn set_cancel_handler(&self, handler: impl FnOnce() + Send + 'static) {
        *self.cancel_handler.lock() = Some(Box::new(handler));
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> TimerState {
        *self.state.lock()
    }

    pub fn run(&self) {
        let mut state = self.state.lock();
        if *state == TimerState::Running {
            return;
        }
        *state = TimerState::Running;
        self.running.send_replace(true);
    }

    pub fn suspend(&self) {
        let mut state = self.state.lock();
        if *state == TimerState::Suspended {
            return;
        }
        *state = TimerState::Suspended;
        self.running.send_replace(false);
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        *self.event_handler.lock() = None;
        // A suspended timer is resumed before it is cancelled.
        self.run();
        self.shutdown.cancel();
        if let Some(cancel) = self.cancel_handler.lock().take() {
            cancel();
        }
        debug!("Repeating timer ({:?}) cancelled", self.interval);
    }
}

async fn drive(
    interval: Duration,
    mut running: watch::Receiver<bool>,
    event_handler: Arc<Mutex<Option<EventHandler>>>,
    shutdown: CancellationToken,
) {
    loop {
        while !*running.borrow_and_update() {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                changed = running.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                changed = running.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !*running.borrow_and_update() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Cloned so the handler runs without holding the lock.
                    let handler = event_handler.lock().clone();
                    if let Some(handler) = handler {
                        handler();
                    }
                }
            }
        }
    }
}
