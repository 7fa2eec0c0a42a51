use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::builder::EventLoopBuilder;
use super::coordinator::Coordinator;
use super::dispatch::{panic_message, DispatchCounters};
use super::state::{LoopControl, LoopState};
use crate::error::{AdmissionRejected, LoopError, Result};
use crate::event::ScheduledEvent;
use crate::handler::HandlerRegistry;
use crate::logging::LogSink;
use crate::store::EventStore;

/// Point-in-time view of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub state: LoopState,
    pub catching_up: bool,
    /// Events stored and not yet fired.
    pub pending_events: usize,
    /// Stored buckets due before the current second.
    pub overdue_timestamps: usize,
    /// Executions launched so far.
    pub fired: u64,
    /// Executions that panicked, failed or were cancelled.
    pub faults: u64,
    /// Catch-up replays run so far.
    pub catch_up_cycles: u64,
}

/// Tick-driven event loop.
///
/// Producers call [`schedule_event`](Self::schedule_event) from any thread;
/// a single background task stores admitted events and fires them when their
/// second comes. Overdue events are replayed oldest first before the current
/// second is fired.
///
/// # Example
///
/// ```rust,no_run
/// use tickloop_runtime::{EventLoop, Handler, HandlerMap};
/// use std::time::Duration;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let handlers = HandlerMap::new();
/// handlers.register("greet", Handler::blocking(|payload| {
///     println!("Hello, {:?}!", payload.downcast_ref::<&str>());
///     Ok(())
/// }));
///
/// let event_loop = EventLoop::builder()
///     .tick_interval(Duration::from_millis(100))
///     .registry(handlers)
///     .build()?;
/// event_loop.start()?;
///
/// let now = chrono::Utc::now().timestamp();
/// event_loop.schedule_event(now, 2, "greet", "World")?;
/// # Ok(())
/// # }
/// ```
pub struct EventLoop {
    pub(crate) control: Arc<LoopControl>,
    pub(crate) store: Arc<EventStore>,
    pub(crate) registry: Arc<dyn HandlerRegistry>,
    pub(crate) submissions: mpsc::Sender<ScheduledEvent>,
    pub(crate) submission_capacity: usize,
    pub(crate) counters: Arc<DispatchCounters>,
    pub(crate) clock: Arc<dyn crate::clock::Clock>,
    pub(crate) sink: LogSink,
    pub(crate) tick_interval: Duration,
    pub(crate) coordinator: Mutex<Option<Coordinator>>,
    pub(crate) task: Mutex<Option<JoinHandle<()>>>,
}

impl EventLoop {
    /// Create a new event loop builder.
    pub fn builder() -> EventLoopBuilder {
        EventLoopBuilder::new()
    }

    /// Spawn the coordinator on the current tokio runtime.
    ///
    /// Events scheduled before `start` wait in the submission queue.
    pub fn start(&self) -> Result<()> {
        if self.control.state() == LoopState::Stopped {
            return Err(LoopError::Stopped);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| LoopError::NoRuntime)?;
        let coordinator = self
            .coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(LoopError::AlreadyStarted)?;

        let task = runtime.spawn(self.sink.attach(coordinator.run()));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        self.sink.in_scope(|| {
            info!(tick_interval = ?self.tick_interval, "Event loop starting");
        });
        Ok(())
    }

    /// Stop the loop. Pending events are discarded unfired; running handlers
    /// are neither awaited nor cancelled. Stopping is terminal.
    pub fn stop(&self) {
        if self.control.stop() {
            self.sink.in_scope(|| info!("Event loop stopping"));
        }
    }

    /// Wait for the coordinator task to exit after [`stop`](Self::stop).
    ///
    /// Returns immediately if the loop was never started or is already joined.
    /// A coordinator that ended by panicking is logged and the loop is
    /// marked stopped.
    pub async fn stopped(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(task) = task else {
            return;
        };

        if let Err(e) = task.await {
            self.control.stop();
            let reason = if e.is_panic() {
                panic_message(e.into_panic())
            } else {
                e.to_string()
            };
            self.sink.in_scope(|| {
                error!(error = %reason, "Event loop task ended abnormally");
            });
        }
    }

    /// Schedule `handler_name` to fire at `timestamp + duration` (seconds
    /// since the UNIX epoch) with `payload`.
    ///
    /// Returns as soon as the event is queued; it is stored by the loop
    /// shortly after. Rejected events are never queued. A full submission
    /// queue fails with [`LoopError::QueueFull`] rather than blocking.
    pub fn schedule_event<P>(
        &self,
        timestamp: i64,
        duration: i64,
        handler_name: &str,
        payload: P,
    ) -> Result<()>
    where
        P: Any + Send + Sync,
    {
        self.sink.in_scope(|| {
            let result = self.admit(timestamp, duration, handler_name, Arc::new(payload));
            match &result {
                Ok(()) => info!(
                    handler = handler_name,
                    timestamp,
                    duration,
                    "Event scheduled"
                ),
                Err(e) => error!(
                    handler = handler_name,
                    timestamp,
                    error = %e,
                    "Event scheduling failed"
                ),
            }
            result
        })
    }

    fn admit(
        &self,
        timestamp: i64,
        duration: i64,
        handler_name: &str,
        payload: crate::handler::Payload,
    ) -> Result<()> {
        self.control.admit()?;

        let handler = self
            .registry
            .resolve(handler_name)
            .ok_or_else(|| AdmissionRejected::HandlerNotFound(handler_name.to_string()))?;

        let event = ScheduledEvent::new(timestamp, duration, handler_name, payload, handler);
        self.submissions.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => LoopError::QueueFull {
                capacity: self.submission_capacity,
            },
            TrySendError::Closed(_) => LoopError::Stopped,
        })
    }

    /// Pause the loop: ticks are ignored and new events are rejected.
    /// Returns false if the loop was not running.
    pub fn pause(&self) -> bool {
        let changed = self.control.pause();
        if changed {
            self.sink.in_scope(|| info!("Event loop paused"));
        }
        changed
    }

    /// Resume a paused loop. Returns false if the loop was not paused.
    pub fn unpause(&self) -> bool {
        let changed = self.control.unpause();
        if changed {
            self.sink.in_scope(|| info!("Event loop unpaused"));
        }
        changed
    }

    /// True while overdue events are being replayed.
    pub fn is_catching_up(&self) -> bool {
        self.control.is_catching_up()
    }

    pub fn is_paused(&self) -> bool {
        self.control.state() == LoopState::Paused
    }

    pub fn state(&self) -> LoopState {
        self.control.state()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn stats(&self) -> LoopStats {
        let now = self.clock.now();
        LoopStats {
            state: self.control.state(),
            catching_up: self.control.is_catching_up(),
            pending_events: self.store.event_count(),
            overdue_timestamps: self.store.timestamps_up_to(now.saturating_sub(1)).len(),
            fired: self.counters.fired(),
            faults: self.counters.faults(),
            catch_up_cycles: self.control.catch_up_cycles(),
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.control.stop();
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("state", &self.control.state())
            .field("tick_interval", &self.tick_interval)
            .field("submission_capacity", &self.submission_capacity)
            .finish_non_exhaustive()
    }
}
