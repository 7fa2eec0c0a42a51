use std::fmt;

use crate::handler::{Handler, Payload};

/// An admitted event waiting for its second.
///
/// Built once by `EventLoop::schedule_event` with the handler already
/// resolved; it is consumed when its bucket fires.
#[derive(Clone)]
pub struct ScheduledEvent {
    fire_at: i64,
    timestamp: i64,
    duration: i64,
    handler_name: String,
    payload: Payload,
    handler: Handler,
}

impl ScheduledEvent {
    pub fn new(
        timestamp: i64,
        duration: i64,
        handler_name: impl Into<String>,
        payload: Payload,
        handler: Handler,
    ) -> Self {
        Self {
            fire_at: timestamp.saturating_add(duration),
            timestamp,
            duration,
            handler_name: handler_name.into(),
            payload,
            handler,
        }
    }

    /// Second at which the event is due (`timestamp + duration`).
    pub fn fire_at(&self) -> i64 {
        self.fire_at
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for ScheduledEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledEvent")
            .field("fire_at", &self.fire_at)
            .field("timestamp", &self.timestamp)
            .field("duration", &self.duration)
            .field("handler_name", &self.handler_name)
            .finish_non_exhaustive()
    }
}
