//! Glob enumeration of package files.
//!
//! Patterns are `/`-separated and relative to the package directory. A
//! leading `!` negates a pattern; negated patterns exclude matching entries
//! and everything beneath them. A trailing `/` restricts a pattern to
//! directories. `@(a|b)` alternations (as produced by brace expansion) are
//! accepted alongside `{a,b}`.
//!
//! Enumeration is lazy: each positive pattern walks only the literal
//! directory prefix it names, in pattern order, and an entry matched by more
//! than one pattern is produced once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::file::FileRecord;
use crate::paths;

/// Lazily produced file records; walk failures surface as `Err` items.
pub type FileStream = Box<dyn Iterator<Item = Result<FileRecord>> + Send>;

/// Produces the file records matched by a pattern list under a base directory.
pub trait GlobEnumerator: Send + Sync + std::fmt::Debug {
    /// Enumerate `patterns` relative to `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile.
    fn enumerate(&self, patterns: &[String], base: &Path) -> Result<FileStream>;
}

/// [`GlobEnumerator`] over the real filesystem, backed by `ignore` and
/// `globset`. Hidden files and ignore files get no special treatment.
#[derive(Debug, Default)]
pub struct FsGlobEnumerator;

impl GlobEnumerator for FsGlobEnumerator {
    fn enumerate(&self, patterns: &[String], base: &Path) -> Result<FileStream> {
        let mut positives = Vec::new();
        let mut negatives = GlobSetBuilder::new();
        for raw in patterns {
            let raw = raw.trim();
            if let Some(negated) = raw.strip_prefix('!') {
                let pattern = clean_pattern(negated);
                negatives.add(build_glob(&pattern)?);
                negatives.add(build_glob(&format!("{pattern}/**"))?);
            } else if !raw.is_empty() {
                positives.push(PositiveGlob::new(raw)?);
            }
        }
        let negatives = negatives.build().context("failed to build negated globs")?;

        let base = base.to_path_buf();
        let mut seen = HashSet::new();
        let stream = positives
            .into_iter()
            .flat_map(move |glob| glob.entries(base.clone()))
            .filter(move |entry| match entry {
                Ok(file) => {
                    !negatives.is_match(file.relative()) && seen.insert(file.relative().to_string())
                }
                Err(_) => true,
            });
        Ok(Box::new(stream))
    }
}

/// One positive pattern and the directory it is confined to.
#[derive(Debug)]
struct PositiveGlob {
    pattern: String,
    matcher: GlobMatcher,
    directories_only: bool,
    literal: bool,
    root: String,
}

impl PositiveGlob {
    fn new(raw: &str) -> Result<Self> {
        let directories_only = raw.ends_with('/') || raw.ends_with('\\');
        let pattern = clean_pattern(raw);
        let segments: Vec<&str> = pattern.split('/').collect();
        let literal_segments: Vec<&str> = segments
            .iter()
            .copied()
            .take_while(|s| !has_glob_meta(s))
            .collect();
        let literal = literal_segments.len() == segments.len();
        let root = if literal {
            pattern.clone()
        } else {
            literal_segments.join("/")
        };
        Ok(Self {
            matcher: build_glob(&pattern)?.compile_matcher(),
            pattern,
            directories_only,
            literal,
            root,
        })
    }

    fn accepts(&self, is_directory: bool) -> bool {
        !self.directories_only || is_directory
    }

    fn entries(self, base: PathBuf) -> FileStream {
        let root = base.join(&self.root);
        if self.literal {
            let record = root
                .metadata()
                .ok()
                .map(|meta| meta.is_dir())
                .filter(|is_dir| self.accepts(*is_dir))
                .map(|is_dir| Ok(FileRecord::new(&base, &self.pattern, is_dir)));
            return Box::new(record.into_iter());
        }
        if !root.exists() {
            return Box::new(std::iter::empty());
        }

        let walker = WalkBuilder::new(&root)
            .standard_filters(false)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();
        Box::new(walker.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            let relative = relative_to(&base, entry.path())?;
            let is_directory = entry.file_type().is_some_and(|ft| ft.is_dir());
            (self.accepts(is_directory) && self.matcher.is_match(&relative))
                .then(|| Ok(FileRecord::new(&base, &relative, is_directory)))
        }))
    }
}

fn relative_to(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let text = relative.to_string_lossy().replace('\\', "/");
    (!text.is_empty()).then_some(text)
}

fn clean_pattern(raw: &str) -> String {
    let normalized = paths::normalize(&to_globset_syntax(raw));
    normalized.trim_start_matches("./").to_string()
}

fn has_glob_meta(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{']) || segment.contains("@(")
}

fn build_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Rewrite `@(a|b)` alternations into `{a,b}`.
fn to_globset_syntax(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut depth = 0usize;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '@' if chars.peek() == Some(&'(') => {
                chars.next();
                depth += 1;
                out.push('{');
            }
            ')' if depth > 0 => {
                depth -= 1;
                out.push('}');
            }
            '|' if depth > 0 => out.push(','),
            other => out.push(other),
        }
    }
    out
}
