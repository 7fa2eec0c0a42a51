//! # Tickloop - in-process, tick-driven event scheduling
//!
//! Register named handlers, then ask for one to fire at a wall-clock second.
//! A background loop wakes on every tick, replays anything it missed in
//! chronological order, and fires what is due now.
//!
//! ## Features
//!
//! - **Second-granularity scheduling**: `fire_at = timestamp + duration`, in seconds since the epoch
//! - **Catch-up replay**: overdue events fire oldest first before the current second
//! - **Pause / resume**: a paused loop ignores ticks and rejects new events
//! - **Fault isolation**: a panicking or failing handler only affects its own execution
//! - **Bounded back-pressure**: a full submission queue is an error, never a stall
//! - **Config support**: TOML/YAML settings with `TICKLOOP_` environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tickloop::{event_handler, Clock, EventLoop, HandlerResult, Payload, SystemClock};
//! use std::time::Duration;
//!
//! #[event_handler]
//! fn greet(payload: Payload) -> HandlerResult {
//!     if let Some(name) = payload.downcast_ref::<String>() {
//!         println!("Hello, {}!", name);
//!     }
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let event_loop = EventLoop::builder()
//!         .tick_interval(Duration::from_millis(100))
//!         .register_linked()
//!         .build()?;
//!     event_loop.start()?;
//!
//!     let now = SystemClock.now();
//!     event_loop.schedule_event(now, 2, "greet", "World".to_string())?;
//!
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     event_loop.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Create `config/tickloop.toml`:
//!
//! ```toml
//! [event_loop]
//! tick_interval = "100ms"
//! submission_capacity = 2000
//! max_concurrent_handlers = 0
//!
//! [event_loop.logging]
//! enabled = true
//! file_path = "logs/tickloop.log"
//! include_info = true
//! ```
//!
//! Or `config/tickloop.yaml`:
//!
//! ```yaml
//! event_loop:
//!   tick_interval: "100ms"
//!   logging:
//!     enabled: true
//! ```
//!
//! Environment variables override file values:
//!
//! ```bash
//! export TICKLOOP_EVENT_LOOP__TICK_INTERVAL=250ms
//! ```

// Re-export macros
pub use tickloop_macro::event_handler;

// Re-export core types
pub use tickloop_runtime::{
    AdmissionRejected, Clock, EventLoop, EventLoopBuilder, Handler, HandlerError, HandlerFault,
    HandlerMap, HandlerRegistry, HandlerResult, LogSettings, LoopError, LoopSettings, LoopState,
    LoopStats, ManualClock, Payload, SystemClock,
};

// Make tickloop_runtime available for macro expansion
pub use tickloop_runtime;
