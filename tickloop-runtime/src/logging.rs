//! Optional per-loop log sink.
//!
//! The loop always emits `tracing` records. When logging is enabled in its
//! settings, those records go to a dedicated JSON subscriber scoped to the
//! loop's own calls and tasks; otherwise they flow to whatever global
//! subscriber the application installed.

use std::future::Future;
use std::sync::Mutex;

use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing::level_filters::LevelFilter;
use tracing::{warn, Dispatch};

use crate::config::LogSettings;
use crate::error::Result;
use crate::rotating_file::RotatingFile;

#[derive(Clone, Default)]
pub struct LogSink {
    dispatch: Option<Dispatch>,
}

impl LogSink {
    /// Sink that defers to the ambient subscriber.
    pub fn ambient() -> Self {
        Self::default()
    }

    /// Build the sink described by `settings`.
    pub fn from_settings(settings: &LogSettings) -> Result<Self> {
        if !settings.enabled {
            return Ok(Self::ambient());
        }

        let level = if settings.include_info {
            LevelFilter::INFO
        } else {
            LevelFilter::ERROR
        };

        let builder = tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .with_current_span(false);

        let dispatch = match &settings.file_path {
            Some(path) => {
                let file = RotatingFile::open(path, settings.max_bytes, settings.max_backups)?;
                Dispatch::new(builder.with_writer(Mutex::new(file)).finish())
            }
            None => Dispatch::new(builder.with_writer(std::io::stderr).finish()),
        };

        Ok(Self {
            dispatch: Some(dispatch),
        })
    }

    /// Like `from_settings`, but a sink that cannot be built only disables
    /// the dedicated sink instead of failing.
    pub fn from_settings_or_ambient(settings: &LogSettings) -> Self {
        Self::from_settings(settings).unwrap_or_else(|e| {
            warn!(
                error = %e,
                path = ?settings.file_path,
                "Log sink unavailable, continuing without it"
            );
            Self::ambient()
        })
    }

    pub fn is_dedicated(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Run `f` with this sink as the default subscriber.
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }

    /// Attach this sink to a future before it is spawned.
    pub fn attach<F: Future>(&self, future: F) -> WithDispatch<F> {
        self.in_scope(|| future.with_current_subscriber())
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("dedicated", &self.is_dedicated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{error, info};

    #[test]
    fn disabled_settings_use_ambient_subscriber() {
        let sink = LogSink::from_settings(&LogSettings::default()).unwrap();
        assert!(!sink.is_dedicated());
    }

    #[test]
    fn unopenable_destination_degrades_to_ambient() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings {
            enabled: true,
            // A directory cannot be opened for appending.
            file_path: Some(dir.path().to_path_buf()),
            include_info: true,
            ..LogSettings::default()
        };

        assert!(LogSink::from_settings(&settings).is_err());
        assert!(!LogSink::from_settings_or_ambient(&settings).is_dedicated());
    }

    #[test]
    fn file_sink_writes_json_and_honors_include_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("loop.log");
        let settings = LogSettings {
            enabled: true,
            file_path: Some(path.clone()),
            include_info: false,
            ..LogSettings::default()
        };

        let sink = LogSink::from_settings(&settings).unwrap();
        sink.in_scope(|| {
            info!(handler = "greet", "event scheduled");
            error!(handler = "greet", "handler panicked");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("handler panicked"));
        assert!(!written.contains("event scheduled"));
        assert!(written.contains("\"level\":\"ERROR\""));
    }

    #[test]
    fn file_sink_rotates_past_max_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.log");
        let settings = LogSettings {
            enabled: true,
            file_path: Some(path.clone()),
            include_info: true,
            max_bytes: 512,
            max_backups: 2,
        };

        let sink = LogSink::from_settings(&settings).unwrap();
        sink.in_scope(|| {
            for seq in 0..40 {
                info!(seq, handler = "greet", "event scheduled");
            }
        });

        assert!(dir.path().join("loop.log.1").exists());
        assert!(dir.path().join("loop.log.2").exists());
        assert!(!dir.path().join("loop.log.3").exists());
        assert!(std::fs::metadata(&path).unwrap().len() <= 512);
        // Records are never split across files.
        let live = std::fs::read_to_string(&path).unwrap();
        assert!(live.lines().all(|line| line.ends_with('}')));
    }
}
