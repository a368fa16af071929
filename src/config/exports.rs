//! The exports document: global rules, default and append rules, and export
//! directives.

use serde::Deserialize;
use serde_json::Value;

use super::{lenient_text, one_or_many};

/// Root of an exports document.
///
/// `rules` and `exports` hold raw entries; each is validated individually
/// so that one malformed entry does not reject the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportsConfig {
    /// Globally declared rules.
    #[serde(default, deserialize_with = "one_or_many")]
    pub rules: Vec<Value>,
    /// Fallbacks for directive fields that are absent.
    #[serde(default)]
    pub default_export_rules: DefaultExportRules,
    /// Entries added to every directive's lists.
    #[serde(default)]
    pub append_export_rules: AppendExportRules,
    /// Export directives in declaration order.
    #[serde(default, deserialize_with = "one_or_many")]
    pub exports: Vec<Value>,
}

/// Values used when a directive leaves a field empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultExportRules {
    /// Default `select`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    /// Default `filter`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub filter: Option<String>,
    /// Default `rename`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub rename: Option<String>,
    /// Default `replaceContent`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub replace_content: Option<String>,
    /// Default `move`.
    #[serde(default, rename = "move", deserialize_with = "lenient_text")]
    pub move_to: Option<String>,
    /// Default `withHierarchy`.
    #[serde(default)]
    pub hierarchy_adjustment: Option<Value>,
}

/// Values appended to every directive's own lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendExportRules {
    /// Appended to `select`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    /// Appended to `filter`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub filter: Option<String>,
    /// Appended to `rename`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub rename: Option<String>,
    /// Appended to `replaceContent`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub replace_content: Option<String>,
}

/// One export directive as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDirective {
    /// Display name; defaulted by position when absent.
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    /// Comma-separated package name matchers.
    #[serde(default, deserialize_with = "lenient_text")]
    pub from: Option<String>,
    /// Comma-separated source items.
    #[serde(default, deserialize_with = "lenient_text")]
    pub select: Option<String>,
    /// Comma-separated filter items.
    #[serde(default, deserialize_with = "lenient_text")]
    pub filter: Option<String>,
    /// Comma-separated rename items.
    #[serde(default, deserialize_with = "lenient_text")]
    pub rename: Option<String>,
    /// Comma-separated replace-content items.
    #[serde(default, deserialize_with = "lenient_text")]
    pub replace_content: Option<String>,
    /// Move reference or destination.
    #[serde(default, rename = "move", deserialize_with = "lenient_text")]
    pub move_to: Option<String>,
    /// Package name substituted into move destinations.
    #[serde(default, deserialize_with = "lenient_text")]
    pub overriding_move_package_name: Option<String>,
    /// Hierarchy adjustment overriding the move rule's own.
    #[serde(default)]
    pub with_hierarchy: Option<Value>,
}
