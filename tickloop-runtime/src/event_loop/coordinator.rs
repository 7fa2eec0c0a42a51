use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::dispatch::Dispatcher;
use super::state::{LoopControl, LoopState};
use crate::clock::Clock;
use crate::event::ScheduledEvent;
use crate::store::EventStore;

/// The single task that owns the tick timer and is the only writer to the
/// store. Handler executions are handed to the dispatcher and never awaited.
pub(crate) struct Coordinator {
    pub(crate) control: Arc<LoopControl>,
    pub(crate) store: Arc<EventStore>,
    pub(crate) submissions: mpsc::Receiver<ScheduledEvent>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) tick_interval: Duration,
}

impl Coordinator {
    /// Run until the loop is stopped, then discard whatever is still stored.
    pub(crate) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut state = self.control.subscribe();

        info!(tick_interval = ?self.tick_interval, "Event loop started");

        loop {
            if self.control.state() == LoopState::Stopped {
                break;
            }

            tokio::select! {
                biased;

                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *state.borrow_and_update();
                    info!(state = ?current, "Event loop state changed");
                }
                _ = ticker.tick() => {
                    self.on_tick();
                }
                Some(event) = self.submissions.recv() => {
                    debug!(
                        handler = event.handler_name(),
                        fire_at = event.fire_at(),
                        "Event stored"
                    );
                    self.store.add(event);
                }
            }
        }

        self.submissions.close();
        let discarded = self.store.clear();
        info!(discarded, "Event loop stopped");
    }

    /// One tick: replay overdue buckets if any, then fire the current second.
    pub(crate) fn on_tick(&self) {
        if !self.control.is_running() {
            return;
        }

        let now = self.clock.now();
        if self.store.has_past_events(now) {
            self.catch_up(now);
        }

        if self.control.is_running() {
            self.dispatcher.fire(now, self.store.take(now));
        }
    }

    /// Fire every bucket before `now`, oldest first. Returns the number of
    /// buckets fired.
    ///
    /// Ends early if the loop leaves `Running`; unfired buckets stay stored.
    pub(crate) fn catch_up(&self, now: i64) -> usize {
        self.replay(now, |_| {})
    }

    /// `catch_up` with a callback run after each bucket has been handed to
    /// the dispatcher. The loop state is re-checked before the next bucket.
    fn replay(&self, now: i64, mut after_bucket: impl FnMut(i64)) -> usize {
        self.control.begin_catch_up();

        let timestamps = self.store.timestamps_up_to(now.saturating_sub(1));
        info!(
            past_timestamps = timestamps.len(),
            current_time = now,
            "Entering catch-up mode"
        );

        let mut fired = 0;
        for timestamp in timestamps {
            if !self.control.is_running() {
                info!(
                    fired,
                    state = ?self.control.state(),
                    "Catch-up interrupted"
                );
                break;
            }
            self.dispatcher.fire(timestamp, self.store.take(timestamp));
            fired += 1;
            after_bucket(timestamp);
        }

        self.control.end_catch_up();
        info!(fired, "Exiting catch-up mode");
        fired
    }
}
