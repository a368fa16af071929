//! Token substitution and string-to-pattern conversion shared by every rule.
//!
//! - `#package#` substitution (optionally normalizing the result as a path)
//! - `/pattern/flags` or literal strings compiled to a [`Pattern`]
//! - `{a,b}` brace groups rewritten to `@(a|b)` glob alternation
//! - longest common prefix of directory paths, used by minimized moves

use regex::{Regex, RegexBuilder};

use crate::error::RuleError;
use crate::paths;

/// Token replaced by the matched package name.
pub const PACKAGE_TOKEN: &str = "#package#";

/// Source pattern replaced by the package's manifest `files` list.
pub const MAIN_TOKEN: &str = "#main#";

/// Default rename match: the entire selected name.
pub const WHOLE_NAME: &str = "/^.*$/g";

/// Default content match: the entire file, newlines included.
pub const WHOLE_CONTENT: &str = r"/^[\s\S]*$/g";

/// Replace every `#package#` in `text` with `package` (empty when absent).
///
/// Path-typed strings are additionally normalized with `/` separators.
#[must_use]
pub fn replace_package_token(text: &str, package: Option<&str>, is_path: bool) -> String {
    let replaced = text.replace(PACKAGE_TOKEN, package.unwrap_or_default());
    if is_path {
        paths::normalize(&replaced)
    } else {
        replaced
    }
}

/// A compiled match/replace expression.
///
/// Mirrors the `g` flag of the configuration syntax: without it, replacement
/// stops after the first match. Matching itself carries no cursor state, so a
/// pattern can be tested any number of times.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    global: bool,
}

impl Pattern {
    /// Compile `text`.
    ///
    /// A string of the form `/pattern/flags` (flags from `gimsuy`) is an
    /// explicit regex; empty flags default to `g`. Any other string is a
    /// literal. In `complete` mode the literal is anchored (`^...$`) and `*`
    /// and `?` act as wildcards.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRegex`] if the expression does not compile.
    pub fn parse(text: &str, complete: bool) -> Result<Self, RuleError> {
        let (source, flags) = split_regex_literal(text.trim()).map_or_else(
            || (literal_source(text, complete), "g".to_string()),
            |(pattern, flags)| {
                let flags = if flags.is_empty() { "g" } else { flags };
                (pattern.to_string(), flags.to_string())
            },
        );

        let mut builder = RegexBuilder::new(&source);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                // `g` is tracked separately; `u` and `y` have no effect here.
                _ => {}
            }
        }
        let regex = builder.build().map_err(|e| RuleError::InvalidRegex {
            pattern: text.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            regex,
            global: flags.contains('g'),
        })
    }

    /// Whether `haystack` contains a match.
    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    /// Replace the first match (or every match for global patterns) with
    /// `with`, which may use `$&`, `$1`..`$99` and `$$`.
    #[must_use]
    pub fn replace(&self, haystack: &str, with: &str) -> String {
        let replacement = to_replacement(with);
        let limit = usize::from(!self.global);
        self.regex
            .replacen(haystack, limit, replacement.as_str())
            .into_owned()
    }
}

/// Split `/pattern/flags` into its parts, or `None` for a plain string.
fn split_regex_literal(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let last = rest.rfind('/')?;
    let (pattern, flags) = (&rest[..last], &rest[last + 1..]);
    let valid_flags = flags.chars().all(|c| "gimsuy".contains(c));
    (valid_flags && !pattern.trim().is_empty()).then_some((pattern.trim(), flags.trim()))
}

fn literal_source(text: &str, complete: bool) -> String {
    if !complete {
        return regex::escape(text);
    }
    let mut source = String::with_capacity(text.len() + 2);
    source.push('^');
    let mut buf = [0u8; 4];
    for c in text.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');
    source
}

/// Translate a `$&` / `$n` / `$$` replacement into `regex` crate syntax.
fn to_replacement(with: &str) -> String {
    let mut out = String::with_capacity(with.len());
    let mut chars = with.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push_str("$$");
            }
            Some('&') => {
                chars.next();
                out.push_str("${0}");
            }
            Some(d) if d.is_ascii_digit() => {
                let mut group = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    if group.len() == 2 {
                        break;
                    }
                    group.push(d);
                    chars.next();
                }
                out.push_str(&format!("${{{group}}}"));
            }
            _ => out.push_str("$$"),
        }
    }
    out
}

/// Rewrite `{a,b,c}` groups into `@(a|b|c)`, innermost groups first.
#[must_use]
pub fn replace_braced_glob_patterns(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = String::with_capacity(src.len());
    let mut start = 0;
    let mut index = 0;
    while index < bytes.len() {
        if bytes.get(index) == Some(&b'{')
            && let Some(close) = matching_brace(bytes, index)
        {
            out.push_str(&src[start..index]);
            let inner = replace_braced_glob_patterns(&src[index + 1..close]);
            out.push_str("@(");
            out.push_str(&inner.split(',').collect::<Vec<_>>().join("|"));
            out.push(')');
            index = close + 1;
            start = index;
            continue;
        }
        index += 1;
    }
    out.push_str(&src[start..]);
    out
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Longest shared leading text of `items`, compared case-insensitively.
///
/// One item yields that item; no items yield `None`.
#[must_use]
pub fn find_common_segment<S: AsRef<str>>(items: &[S]) -> Option<String> {
    let (first, rest) = items.split_first()?;
    let first = first.as_ref();
    let mut others: Vec<std::str::Chars<'_>> = rest.iter().map(|s| s.as_ref().chars()).collect();
    let mut common = String::new();
    for c in first.chars() {
        let all_same = others
            .iter_mut()
            .all(|it| it.next().is_some_and(|o| chars_eq_ignore_case(c, o)));
        if !all_same {
            break;
        }
        common.push(c);
    }
    Some(common)
}

/// Strip `common` from the directory part of `relative` when it is a
/// (case-insensitive) prefix of it. An empty segment leaves the path as is.
#[must_use]
pub fn remove_common_segment(relative: &str, common: &str) -> String {
    let common = common.trim();
    if common.is_empty() {
        return relative.to_string();
    }
    let dir = paths::dirname(relative);
    let prefix_len = common.chars().count();
    let is_prefix = dir.chars().count() >= prefix_len
        && dir
            .chars()
            .zip(common.chars())
            .all(|(a, b)| chars_eq_ignore_case(a, b));
    if !is_prefix {
        return relative.to_string();
    }
    // The prefix is textual: a common "." from root-level files strips the
    // dot of a sibling ".github", leaving "github".
    let rest: String = dir.chars().skip(prefix_len).collect();
    paths::join(&rest, paths::basename(relative))
}
