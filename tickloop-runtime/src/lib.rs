//! Tickloop Runtime - core of the tick-driven event loop
//!
//! This crate provides the event store, the coordinating loop, catch-up
//! replay, pause/resume admission and fault-isolated handler dispatch.

mod clock;
mod config;
mod error;
mod event;
mod event_loop;
mod handler;
mod logging;
mod registry;
mod rotating_file;
mod store;
mod time_unit;

// Re-export public API
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    load_toml_config, load_yaml_config, LogSettings, LoopSettings, DEFAULT_MAX_LOG_BACKUPS,
    DEFAULT_MAX_LOG_BYTES, SETTINGS_SECTION,
};
pub use error::{AdmissionRejected, HandlerFault, LoopError, Result};
pub use event::ScheduledEvent;
pub use event_loop::{EventLoop, EventLoopBuilder, LoopState, LoopStats};
pub use handler::{
    Handler, HandlerError, HandlerFuture, HandlerMap, HandlerRegistry, HandlerResult, Payload,
};
pub use linkme;
pub use logging::LogSink;
pub use registry::{linked_handlers, RegisteredHandler, EVENT_HANDLERS};
pub use store::EventStore;
pub use time_unit::TimeUnit;
