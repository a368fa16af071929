//! The file record flowing through every pipeline stage.

use std::io;
use std::path::{Path, PathBuf};

use crate::operations::FileSystemOps;
use crate::paths;

/// Which part of a path a filter predicate or rename addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameSegment {
    /// The whole relative path.
    FullName,
    /// The directory part.
    DirName,
    /// The final segment including its extension.
    #[default]
    FileName,
    /// The final segment without its extension.
    BaseName,
    /// The extension including the leading dot.
    ExtName,
}

impl NameSegment {
    /// Variant names in ordinal order, for configuration parsing.
    pub const VARIANTS: [(&'static str, Self); 5] = [
        ("FullName", Self::FullName),
        ("DirName", Self::DirName),
        ("FileName", Self::FileName),
        ("BaseName", Self::BaseName),
        ("ExtName", Self::ExtName),
    ];
}

/// One enumerated file or directory.
///
/// `relative` is the mutable destination path; stages rewrite it. The
/// `source` path never changes and is where contents are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    source: PathBuf,
    base: PathBuf,
    relative: String,
    is_directory: bool,
    contents: Option<Vec<u8>>,
}

impl FileRecord {
    /// Record for `relative` under `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>, relative: &str, is_directory: bool) -> Self {
        let base = base.into();
        let relative = paths::normalize(relative);
        Self {
            source: base.join(&relative),
            base,
            relative,
            is_directory,
            contents: None,
        }
    }

    /// Absolute path of the enumerated entry.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory the entry was enumerated from.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Current `/`-separated destination path.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Replace the destination path; the value is normalized.
    pub fn set_relative(&mut self, relative: &str) {
        self.relative = paths::normalize(relative);
    }

    /// Destination path with a trailing `/` for directories.
    #[must_use]
    pub fn display_path(&self) -> String {
        if self.is_directory {
            format!("{}/", self.relative)
        } else {
            self.relative.clone()
        }
    }

    /// Whether the entry is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Directory part of the destination path.
    #[must_use]
    pub fn dirname(&self) -> String {
        paths::dirname(&self.relative)
    }

    /// Final segment of the destination path.
    #[must_use]
    pub fn basename(&self) -> &str {
        paths::basename(&self.relative)
    }

    /// Final segment without its extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        paths::stem(&self.relative)
    }

    /// Extension including the leading dot.
    #[must_use]
    pub fn extname(&self) -> &str {
        paths::extname(&self.relative)
    }

    /// Text of `segment` of the destination path.
    #[must_use]
    pub fn segment(&self, segment: NameSegment) -> String {
        match segment {
            NameSegment::FullName => self.relative.clone(),
            NameSegment::DirName => self.dirname(),
            NameSegment::FileName => self.basename().to_string(),
            NameSegment::BaseName => self.stem().to_string(),
            NameSegment::ExtName => self.extname().to_string(),
        }
    }

    /// Replace `segment` of the destination path with `value`.
    pub fn set_segment(&mut self, segment: NameSegment, value: &str) {
        let relative = match segment {
            NameSegment::FullName => value.to_string(),
            NameSegment::DirName => paths::join(value, self.basename()),
            NameSegment::FileName => paths::join(&self.dirname(), value),
            NameSegment::BaseName => {
                paths::join(&self.dirname(), &format!("{value}{}", self.extname()))
            }
            NameSegment::ExtName => paths::join(&self.dirname(), &format!("{}{value}", self.stem())),
        };
        self.set_relative(&relative);
    }

    /// Contents, if loaded or replaced.
    #[must_use]
    pub fn contents(&self) -> Option<&[u8]> {
        self.contents.as_deref()
    }

    /// Whether contents were loaded or replaced.
    #[must_use]
    pub const fn has_contents(&self) -> bool {
        self.contents.is_some()
    }

    /// Replace the contents.
    pub fn set_contents(&mut self, contents: Vec<u8>) {
        self.contents = Some(contents);
    }

    /// Read the contents from the source path on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is a directory or cannot be read.
    pub fn load_contents(&mut self, fs: &dyn FileSystemOps) -> io::Result<&[u8]> {
        if self.is_directory {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "directories have no contents",
            ));
        }
        if self.contents.is_none() {
            self.contents = Some(fs.read(&self.source)?);
        }
        Ok(self.contents.as_deref().unwrap_or_default())
    }
}
