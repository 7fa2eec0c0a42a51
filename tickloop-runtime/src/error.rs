//! Error types for the event loop.

use thiserror::Error;

/// Result type for event loop operations.
pub type Result<T> = std::result::Result<T, LoopError>;

/// Reasons `schedule_event` refuses an event before it reaches the loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionRejected {
    /// The loop is paused.
    #[error("event loop is paused")]
    Paused,

    /// The loop is replaying overdue events.
    #[error("currently catching up with past events")]
    CatchingUp,

    /// The registry has no handler under this name.
    #[error("handler '{0}' not found")]
    HandlerNotFound(String),
}

/// Errors returned by the event loop and its builder.
#[derive(Debug, Error)]
pub enum LoopError {
    /// Admission was refused.
    #[error("event rejected: {0}")]
    Rejected(#[from] AdmissionRejected),

    /// The submission channel is full.
    #[error("submission queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The loop has been stopped.
    #[error("event loop is stopped")]
    Stopped,

    /// `start` was called more than once.
    #[error("event loop already started")]
    AlreadyStarted,

    /// `start` was called outside of a tokio runtime.
    #[error("no tokio runtime available to run the event loop")]
    NoRuntime,

    /// A setting has a value the loop cannot use.
    #[error("invalid setting '{key}': {value}")]
    InvalidSetting { key: &'static str, value: String },

    /// Loading configuration failed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Opening the log destination failed.
    #[error("log sink error: {0}")]
    LogSink(#[from] std::io::Error),
}

/// Abnormal termination of a single handler execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFault {
    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler failed: {0}")]
    Failed(String),

    #[error("handler execution was cancelled")]
    Cancelled,
}
