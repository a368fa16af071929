//! Configuration: run options, the exports document, and package manifests.
//!
//! Configuration values are free-form JSON. Every string field is read
//! leniently: non-strings and blank strings count as absent. Enumerations
//! are parsed strictly by [`parse_enum`].

pub mod exports;
pub mod manifest;

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::logging::LogLevel;

/// Plugin-level options for one invocation.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Path of the dependency manifest (`package.json`).
    pub manifest_path: PathBuf,
    /// External exports document; when absent the manifest's embedded
    /// `npmExports` section is used.
    pub exports_json_file_path: Option<PathBuf>,
    /// Minimum severity emitted by the logger.
    pub log_level: LogLevel,
    /// Resolve exports concurrently.
    pub parallel: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("package.json"),
            exports_json_file_path: None,
            log_level: LogLevel::default(),
            parallel: true,
        }
    }
}

/// Trimmed text of a JSON string; `None` for non-strings and blank strings.
#[must_use]
pub fn text(value: Option<&Value>) -> Option<String> {
    let trimmed = value?.as_str()?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trimmed text of a JSON string, keeping blank strings as `""`.
#[must_use]
pub fn text_allow_empty(value: Option<&Value>) -> Option<String> {
    Some(value?.as_str()?.trim().to_string())
}

/// Parse an enumeration value from its case-insensitive name or ordinal.
///
/// Returns `None` for anything else, including names with surrounding
/// garbage and out-of-range ordinals.
#[must_use]
pub fn parse_enum<T: Copy>(value: Option<&Value>, variants: &[(&str, T)]) -> Option<T> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            variants
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(s))
                .map(|(_, variant)| *variant)
        }
        Value::Number(n) => {
            let index = usize::try_from(n.as_u64()?).ok()?;
            variants.get(index).map(|(_, variant)| *variant)
        }
        _ => None,
    }
}

/// Deserialize a lenient text field (see [`text`]).
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(text(value.as_ref()))
}

/// Deserialize a field that holds one entry or an array of entries.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    })
}
