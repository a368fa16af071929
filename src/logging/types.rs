//! Core logging types: severity levels, export summary entries, and the
//! [`Log`] trait.
use std::fmt;
use std::str::FromStr;

/// Minimum severity of emitted messages, ordered
/// `Debug < Information < Warning < Success < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Diagnostic detail (resolved patterns, per-file decisions).
    Debug,
    /// Progress messages.
    Information,
    /// Recoverable problems: dropped rules, excluded exports.
    #[default]
    Warning,
    /// Completion messages.
    Success,
    /// Failures that drop a file, pipeline, export, or the run.
    Error,
}

impl LogLevel {
    const ALL: [Self; 5] = [
        Self::Debug,
        Self::Information,
        Self::Warning,
        Self::Success,
        Self::Error,
    ];

    /// Canonical name of the level.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Success => "Success",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    /// Parse a level by case-insensitive name or by ordinal (`0`-`4`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<usize>() {
            return Self::ALL
                .get(ordinal)
                .copied()
                .ok_or_else(|| format!("log level out of range: {ordinal}"));
        }
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown log level: {trimmed}"))
    }
}

/// Outcome of one export, for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    /// Files were written to the destination.
    Exported,
    /// Files were listed but not written.
    DryRun,
    /// The export matched no files.
    Empty,
    /// The export was dropped during resolution.
    Excluded,
}

/// Summary line for one export.
#[derive(Debug, Clone)]
pub struct ExportEntry {
    /// Export name.
    pub name: String,
    /// Final status of the export.
    pub status: ExportStatus,
    /// Optional detail (file counts, exclusion reason).
    pub message: Option<String>,
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (direct output) and
/// [`BufferedLog`](super::buffered::BufferedLog) (deferred output for
/// parallel export resolution) implement this trait, so engine code logs
/// without knowing whether output is immediate or buffered.
pub trait Log: Send + Sync + fmt::Debug {
    /// Whether messages at `level` pass the configured minimum.
    fn enabled(&self, level: LogLevel) -> bool;
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log a debug message.
    fn debug(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log a success message.
    fn success(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record an export result for the summary.
    fn record_export(&self, name: &str, status: ExportStatus, message: Option<&str>);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Information);
        assert!(LogLevel::Information < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Success);
        assert!(LogLevel::Success < LogLevel::Error);
        assert_eq!(LogLevel::default(), LogLevel::Warning);
    }

    #[test]
    fn parse_by_name_ignores_case_and_whitespace() {
        assert_eq!(" debug ".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("INFORMATION".parse::<LogLevel>().unwrap(), LogLevel::Information);
        assert_eq!("Success".parse::<LogLevel>().unwrap(), LogLevel::Success);
    }

    #[test]
    fn parse_by_ordinal() {
        assert_eq!("0".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("4".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("5".parse::<LogLevel>().is_err());
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!("".parse::<LogLevel>().is_err());
    }
}
