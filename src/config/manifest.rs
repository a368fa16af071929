//! Package manifest (`package.json`) reading.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::operations::FileSystemOps;

/// The fields of a `package.json` the export engine reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Declared dependencies, in declaration order.
    #[serde(default)]
    pub dependencies: Option<Map<String, Value>>,
    /// Embedded exports document.
    #[serde(default)]
    pub npm_exports: Option<Value>,
    /// Published file list (`#main#` expansion).
    #[serde(default)]
    pub files: Option<Value>,
}

impl PackageManifest {
    /// Dependency names in declaration order, blank names skipped.
    #[must_use]
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .flat_map(Map::keys)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Trimmed, non-blank entries of `files`; a single string counts as one
    /// entry. Empty when absent.
    #[must_use]
    pub fn main_files(&self) -> Vec<String> {
        let entries = match &self.files {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single @ Value::String(_)) => vec![single],
            _ => Vec::new(),
        };
        entries
            .into_iter()
            .filter_map(|v| super::text(Some(v)))
            .collect()
    }
}

/// Read and parse a JSON document at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::InvalidJson`] if it does not parse as `T`.
pub fn read_json<T: serde::de::DeserializeOwned>(
    fs: &dyn FileSystemOps,
    path: &Path,
) -> Result<T, ConfigError> {
    let text = fs.read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::InvalidJson {
        path: path.display().to_string(),
        source,
    })
}

/// Load the manifest at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON object.
pub fn load(fs: &dyn FileSystemOps, path: &Path) -> Result<PackageManifest, ConfigError> {
    read_json(fs, path)
}
