//! Buffered logger for parallel export resolution.
use std::sync::{Arc, Mutex};

use super::logger::{Logger, STAGE_TARGET, SUCCESS_TARGET};
use super::types::{ExportStatus, Log, LogLevel};

/// A single buffered log entry, replayed when flushed.
#[derive(Debug, Clone)]
enum LogEntry {
    Stage(String),
    Debug(String),
    Info(String),
    Warn(String),
    Success(String),
    Error(String),
}

impl LogEntry {
    /// Replay this entry to the console and log file via tracing.
    ///
    /// The level check already happened when the entry was buffered.
    fn replay(&self) {
        match self {
            Self::Stage(msg) => tracing::info!(target: STAGE_TARGET, "{msg}"),
            Self::Debug(msg) => tracing::debug!("{msg}"),
            Self::Info(msg) => tracing::info!("{msg}"),
            Self::Warn(msg) => tracing::warn!("{msg}"),
            Self::Success(msg) => tracing::info!(target: SUCCESS_TARGET, "{msg}"),
            Self::Error(msg) => tracing::error!("{msg}"),
        }
    }
}

/// Implement the display methods of [`Log`] by buffering each message that
/// passes the backing logger's minimum level.
macro_rules! buffer_log_methods {
    ($($method:ident => $variant:ident => $level:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                if !self.inner.enabled(LogLevel::$level) {
                    return;
                }
                if let Ok(mut guard) = self.entries.lock() {
                    guard.push(LogEntry::$variant(msg.to_string()));
                }
            }
        )+
    };
}

/// Buffered logger for work that runs on the rayon pool.
///
/// Each export resolves with its own `BufferedLog`; the entries are replayed
/// with [`flush`](Self::flush) in export declaration order so that console
/// output never interleaves. [`record_export`](Log::record_export) is
/// forwarded directly to the backing [`Logger`].
#[derive(Debug)]
pub struct BufferedLog {
    inner: Arc<Logger>,
    entries: Mutex<Vec<LogEntry>>,
}

impl BufferedLog {
    /// Create a new buffered logger backed by the given [`Logger`].
    #[must_use]
    pub const fn new(inner: Arc<Logger>) -> Self {
        Self {
            inner,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Replay and clear all buffered entries.
    ///
    /// Holds the backing logger's flush lock so concurrent flushes do not
    /// interleave.
    pub fn flush(&self) {
        let _guard = self
            .inner
            .flush_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let entries = match self.entries.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return,
        };
        for entry in &entries {
            entry.replay();
        }
    }
}

impl Log for BufferedLog {
    fn enabled(&self, level: LogLevel) -> bool {
        self.inner.enabled(level)
    }

    buffer_log_methods! {
        stage   => Stage   => Information,
        debug   => Debug   => Debug,
        info    => Info    => Information,
        warn    => Warn    => Warning,
        success => Success => Success,
        error   => Error   => Error,
    }

    fn record_export(&self, name: &str, status: ExportStatus, message: Option<&str>) {
        self.inner.record_export(name, status, message);
    }
}
