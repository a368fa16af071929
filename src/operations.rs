//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so that manifest loading, `#main#`
//! expansion and content reads can be unit-tested without touching the real
//! filesystem.  Production code uses [`SystemFileSystemOps`]; tests use
//! `MockFileSystemOps`.

use std::io;
use std::path::{Path, PathBuf};

/// Abstraction over the filesystem queries made by the export engine.
///
/// The production implementation is [`SystemFileSystemOps`].
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Read the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Read the whole file at `path` as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Resolve `path` to an absolute path without UNC prefixes on Windows.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not exist.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        dunce::canonicalize(path)
    }
}

/// Mock [`FileSystemOps`] for unit tests.
///
/// Pre-configure files (with contents) and directories using the
/// builder-style methods, then pass `Arc::new(mock)` to the execution
/// context.
///
/// # Example
///
/// ```ignore
/// use npm_exports_cli::operations::MockFileSystemOps;
///
/// let fs = MockFileSystemOps::new()
///     .with_dir("/proj/node_modules")
///     .with_file("/proj/package.json", r#"{"dependencies":{"lodash":"1.0.0"}}"#);
/// ```
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    files: std::collections::HashMap<PathBuf, Vec<u8>>,
    dirs: Vec<PathBuf>,
    reads: std::sync::Mutex<Vec<PathBuf>>,
}

#[cfg(test)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a regular file with the given contents.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Register a directory.
    #[must_use]
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let d = path.into();
        if !self.dirs.contains(&d) {
            self.dirs.push(d);
        }
        self
    }

    /// Number of times `path` was read.
    #[allow(clippy::expect_used)]
    pub fn read_count(&self, path: &Path) -> usize {
        self.reads
            .lock()
            .expect("mock read log poisoned")
            .iter()
            .filter(|p| *p == path)
            .count()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl FileSystemOps for MockFileSystemOps {
    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.iter().any(|d| d == path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads
            .lock()
            .expect("mock read log poisoned")
            .push(path.to_path_buf());
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        if self.files.contains_key(path) || self.is_dir(path) {
            Ok(path.to_path_buf())
        } else {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn system_ops_read_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("package.json");
        std::fs::write(&file, "{}").unwrap();
        let fs = SystemFileSystemOps;
        assert_eq!(fs.canonicalize(&file).unwrap(), dunce::canonicalize(&file).unwrap());
        assert!(fs.canonicalize(&dir.path().join("missing")).is_err());
        assert!(fs.is_dir(dir.path()));
        assert!(!fs.is_dir(&file));
        assert_eq!(fs.read_to_string(&file).unwrap(), "{}");
        assert!(fs.read(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn read_to_string_rejects_invalid_utf8() {
        let fs = MockFileSystemOps::new().with_file("/bin.dat", vec![0xff, 0xfe]);
        let err = fs.read_to_string(Path::new("/bin.dat")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn mock_tracks_reads() {
        let fs = MockFileSystemOps::new()
            .with_dir("/proj")
            .with_file("/proj/a.txt", "a");
        assert!(fs.is_dir(Path::new("/proj")));
        assert_eq!(fs.canonicalize(Path::new("/proj/a.txt")).unwrap(), Path::new("/proj/a.txt"));
        assert!(fs.canonicalize(Path::new("/proj/b.txt")).is_err());
        fs.read(Path::new("/proj/a.txt")).unwrap();
        fs.read(Path::new("/proj/a.txt")).unwrap();
        assert_eq!(fs.read_count(Path::new("/proj/a.txt")), 2);
        assert!(fs.canonicalize(Path::new("/nope")).is_err());
    }
}
