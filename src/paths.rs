//! POSIX-style helpers for the `/`-separated relative paths carried by
//! [`FileRecord`](crate::file::FileRecord).
//!
//! Relative paths are kept as strings so that rule predicates see the same
//! text on every platform; backslashes are folded to `/` on normalization.

/// Normalize a path: fold separators, drop `.` segments and resolve `..`.
///
/// An empty result becomes `"."`. Trailing separators are not preserved.
#[must_use]
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join two path fragments and normalize the result.
#[must_use]
pub fn join(base: &str, tail: &str) -> String {
    match (base.is_empty(), tail.is_empty()) {
        (true, _) => normalize(tail),
        (_, true) => normalize(base),
        _ => normalize(&format!("{base}/{tail}")),
    }
}

/// Directory portion of `path` (`"."` when there is none).
#[must_use]
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(index) => trimmed[..index].to_string(),
        None => ".".to_string(),
    }
}

/// Final segment of `path`, including the extension.
#[must_use]
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rfind('/').map_or(trimmed, |index| &trimmed[index + 1..])
}

/// Extension of the final segment including the leading dot, or `""`.
///
/// A leading dot alone (`.bashrc`) is not an extension.
#[must_use]
pub fn extname(path: &str) -> &str {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(index) => &name[index..],
    }
}

/// Final segment of `path` without its extension.
#[must_use]
pub fn stem(path: &str) -> &str {
    let name = basename(path);
    &name[..name.len() - extname(path).len()]
}
