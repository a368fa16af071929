//! Helpers for the `npm-exports` log file and the plain text written to it.
use std::fs;
use std::path::PathBuf;

/// Drop terminal escape sequences from `s`.
///
/// The export summary and stage headers carry colour codes on the console.
/// Every CSI sequence (`ESC [` up to a final byte in `@`..=`~`) is removed
/// so that the log file stays plain text.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next_if_eq(&'[').is_some() {
            while chars.next().is_some_and(|inner| !('@'..='~').contains(&inner)) {}
        } else {
            chars.next();
        }
    }
    out
}

/// Directory holding one log file per command, created on first use.
///
/// `$XDG_CACHE_HOME/npm-exports`, falling back to `~/.cache/npm-exports`.
fn log_dir() -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME")
        .map_or_else(|| home_dir().join(".cache"), PathBuf::from);
    let dir = cache.join("npm-exports");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
}

/// Log file for `command`, e.g. `~/.cache/npm-exports/run.log`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(log_dir()?.join(format!("{command}.log")))
}

/// Resolution of a UTC stamp written to the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Stamp {
    /// Date and time, for the run header.
    Header,
    /// Time of day, prefixed to each line.
    Line,
}

impl Stamp {
    /// Current UTC time in this resolution.
    pub(super) fn now(self) -> String {
        let format = match self {
            Self::Header => "%Y-%m-%d %H:%M:%S UTC",
            Self::Line => "%H:%M:%S",
        };
        chrono::Utc::now().format(format).to_string()
    }
}
