use super::coordinator::Coordinator;
use super::dispatch::Dispatcher;
use super::event_loop::EventLoop;
use super::state::LoopControl;
use crate::clock::{Clock, SystemClock};
use crate::config::{load_toml_config, load_yaml_config, LogSettings, LoopSettings};
use crate::error::{LoopError, Result};
use crate::handler::{HandlerMap, HandlerRegistry};
use crate::logging::LogSink;
use crate::store::EventStore;
use config::Config;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Builder for the event loop
pub struct EventLoopBuilder {
    settings: LoopSettings,
    tick_interval: Option<Duration>,
    registry: Option<Arc<dyn HandlerRegistry>>,
    clock: Arc<dyn Clock>,
}

impl Default for EventLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoopBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::with_settings(LoopSettings::default())
    }

    /// Create with explicit settings
    pub fn with_settings(settings: LoopSettings) -> Self {
        Self {
            settings,
            tick_interval: None,
            registry: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create from an already loaded config (reads the `[event_loop]` section)
    pub fn with_config(config: &Config) -> Result<Self> {
        Ok(Self::with_settings(LoopSettings::from_config(config)?))
    }

    /// Create with TOML config file
    pub fn with_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = load_toml_config(path)?;
        Self::with_config(&config)
    }

    /// Create with YAML config file
    pub fn with_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = load_yaml_config(path)?;
        Self::with_config(&config)
    }

    /// Override the tick interval from settings
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Set the registry handler names are resolved against
    pub fn registry(mut self, registry: impl HandlerRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Resolve handlers from every `#[event_handler]` function linked into the binary
    pub fn register_linked(self) -> Self {
        self.registry(HandlerMap::linked())
    }

    /// Replace the wall clock (tests and simulations)
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn submission_capacity(mut self, capacity: usize) -> Self {
        self.settings.submission_capacity = capacity;
        self
    }

    /// Cap concurrently running handlers; 0 leaves them unbounded
    pub fn max_concurrent_handlers(mut self, max: usize) -> Self {
        self.settings.max_concurrent_handlers = max;
        self
    }

    pub fn logging(mut self, logging: LogSettings) -> Self {
        self.settings.logging = logging;
        self
    }

    /// Build the event loop (does not start it yet)
    ///
    /// Invalid tick interval or capacity fail here. A log destination that
    /// cannot be opened only disables the dedicated sink.
    pub fn build(self) -> Result<EventLoop> {
        let tick_interval = match self.tick_interval {
            Some(interval) if interval.is_zero() => {
                return Err(LoopError::InvalidSetting {
                    key: "tick_interval",
                    value: format!("{:?}", interval),
                })
            }
            Some(interval) => interval,
            None => self.settings.tick_interval()?,
        };

        let capacity = self.settings.submission_capacity;
        if capacity == 0 {
            return Err(LoopError::InvalidSetting {
                key: "submission_capacity",
                value: capacity.to_string(),
            });
        }

        let sink = LogSink::from_settings_or_ambient(&self.settings.logging);
        let registry = self.registry.unwrap_or_else(|| {
            sink.in_scope(|| warn!("No handler registry configured, every event will be rejected"));
            Arc::new(HandlerMap::new())
        });

        let control = Arc::new(LoopControl::new());
        let store = Arc::new(EventStore::new());
        let dispatcher = Dispatcher::new(self.settings.max_concurrent_handlers, sink.clone());
        let counters = dispatcher.counters();
        let (submissions, receiver) = mpsc::channel(capacity);

        sink.in_scope(|| {
            info!(
                tick_interval = ?tick_interval,
                submission_capacity = capacity,
                max_concurrent_handlers = self.settings.max_concurrent_handlers,
                "Building event loop"
            )
        });

        let coordinator = Coordinator {
            control: Arc::clone(&control),
            store: Arc::clone(&store),
            submissions: receiver,
            dispatcher,
            clock: Arc::clone(&self.clock),
            tick_interval,
        };

        Ok(EventLoop {
            control,
            store,
            registry,
            submissions,
            submission_capacity: capacity,
            counters,
            clock: self.clock,
            sink,
            tick_interval,
            coordinator: Mutex::new(Some(coordinator)),
            task: Mutex::new(None),
        })
    }
}
