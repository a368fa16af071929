//! Structured logger with an explicit minimum level and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{ExportEntry, ExportStatus, Log, LogLevel};
use super::utils::log_file_path;

/// Target of success events, rendered with their own prefix.
pub(super) const SUCCESS_TARGET: &str = "npm_exports::success";
/// Target of stage header events.
pub(super) const STAGE_TARGET: &str = "npm_exports::stage";
/// Target of summary events, which bypass the minimum level.
pub(super) const SUMMARY_TARGET: &str = "npm_exports::summary";

/// Structured logger with an explicit minimum [`LogLevel`].
///
/// Messages below the minimum are discarded before they reach [`tracing`].
/// Everything that passes is written to the console and appended to
/// `$XDG_CACHE_HOME/npm-exports/<command>.log` by the subscriber installed
/// with [`init_subscriber`](super::subscriber::init_subscriber).
#[derive(Debug)]
pub struct Logger {
    min_level: LogLevel,
    exports: Mutex<Vec<ExportEntry>>,
    log_file: Option<PathBuf>,
    /// Serializes replay of buffered output.
    pub(super) flush_lock: Mutex<()>,
}

impl Logger {
    /// Create a new logger that emits messages at `min_level` and above.
    ///
    /// The log file itself is created by
    /// [`init_subscriber`](super::subscriber::init_subscriber); this
    /// constructor only remembers its path for the summary.
    #[must_use]
    pub fn new(command: &str, min_level: LogLevel) -> Self {
        Self {
            min_level,
            exports: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
            flush_lock: Mutex::new(()),
        }
    }

    /// The configured minimum level.
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded export entries.
    #[must_use]
    pub fn export_entries(&self) -> Vec<ExportEntry> {
        self.exports.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Whether messages at `level` are emitted.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        if self.enabled(LogLevel::Debug) {
            tracing::debug!("{msg}");
        }
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        if self.enabled(LogLevel::Information) {
            tracing::info!("{msg}");
        }
    }

    /// Log a stage header; shown at the Information level.
    pub fn stage(&self, msg: &str) {
        if self.enabled(LogLevel::Information) {
            tracing::info!(target: STAGE_TARGET, "{msg}");
        }
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        if self.enabled(LogLevel::Warning) {
            tracing::warn!("{msg}");
        }
    }

    /// Log a success message.
    pub fn success(&self, msg: &str) {
        if self.enabled(LogLevel::Success) {
            tracing::info!(target: SUCCESS_TARGET, "{msg}");
        }
    }

    /// Log an error message. Errors are never filtered.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Record an export result for the summary.
    pub fn record_export(&self, name: &str, status: ExportStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.exports.lock() {
            guard.push(ExportEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of excluded exports.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.exports.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|e| e.status == ExportStatus::Excluded)
                .count()
        })
    }

    /// Print the summary of all recorded exports, regardless of level.
    pub fn print_summary(&self) {
        let entries = self.export_entries();
        if entries.is_empty() {
            return;
        }

        tracing::info!(target: SUMMARY_TARGET, "\x1b[1mSummary\x1b[0m");
        let (mut exported, mut dry_run, mut empty, mut excluded) = (0u32, 0u32, 0u32, 0u32);
        for entry in &entries {
            let (icon, color) = match entry.status {
                ExportStatus::Exported => {
                    exported += 1;
                    ("✓", "\x1b[32m")
                }
                ExportStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                ExportStatus::Empty => {
                    empty += 1;
                    ("·", "\x1b[2m")
                }
                ExportStatus::Excluded => {
                    excluded += 1;
                    ("✗", "\x1b[31m")
                }
            };
            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            tracing::info!(
                target: SUMMARY_TARGET,
                "{color}{icon} {}{suffix}\x1b[0m",
                entry.name
            );
        }

        let total = exported + dry_run + empty + excluded;
        tracing::info!(
            target: SUMMARY_TARGET,
            "{total} exports: \x1b[32m{exported} exported\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[2m{empty} empty\x1b[0m, \x1b[31m{excluded} excluded\x1b[0m"
        );
        if let Some(path) = &self.log_file {
            tracing::info!(target: SUMMARY_TARGET, "\x1b[2mlog: {}\x1b[0m", path.display());
        }
    }
}

impl Log for Logger {
    fn enabled(&self, level: LogLevel) -> bool {
        self.enabled(level)
    }

    fn stage(&self, msg: &str) {
        self.stage(msg);
    }

    fn debug(&self, msg: &str) {
        self.debug(msg);
    }

    fn info(&self, msg: &str) {
        self.info(msg);
    }

    fn warn(&self, msg: &str) {
        self.warn(msg);
    }

    fn success(&self, msg: &str) {
        self.success(msg);
    }

    fn error(&self, msg: &str) {
        self.error(msg);
    }

    fn record_export(&self, name: &str, status: ExportStatus, message: Option<&str>) {
        self.record_export(name, status, message);
    }
}
