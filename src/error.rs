//! Domain-specific error types for the export engine.
//!
//! Library modules return typed errors built with [`thiserror`]; command
//! handlers at the CLI boundary convert them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! ExportsError
//! ├── Config(ConfigError)     — manifest, exports section, registry validation
//! ├── Rule(RuleError)         — rule construction and reference lookup
//! ├── Resolve(ResolveError)   — per-export source resolution
//! └── Pipeline(PipelineError) — per-file and per-pipeline runtime failures
//! ```

use thiserror::Error;

use crate::rules::RuleType;

/// Top-level error type for the export engine.
#[derive(Error, Debug)]
pub enum ExportsError {
    /// Configuration-related error (analysis phase, fatal to the run).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rule construction or lookup error.
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Export resolution error (fatal to one export).
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Pipeline runtime error (fatal to one file or one pipeline).
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Errors raised while loading the manifest and analysing the exports section.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file did not contain valid JSON.
    #[error("Invalid JSON in {path}: {source}")]
    InvalidJson {
        /// Path to the offending file.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The manifest declares no dependencies.
    #[error("No packages found in the package.json (path: '{0}')")]
    NoDependencies(String),

    /// The dependency directory next to the manifest does not exist.
    #[error("Failed to resolve node_modules directory ({0})")]
    ModulesDirectoryMissing(String),

    /// Neither an external exports file nor an embedded section was found.
    #[error("Npm Exports section not found")]
    ExportsSectionMissing,

    /// Every declared rule was dropped during validation.
    #[error("No valid rules present in the npm exports")]
    NoValidRules,

    /// Two or more rules share a `(type, id)` pair.
    #[error("Duplicate rule ids found: {}", format_duplicates(.0))]
    DuplicateRuleIds(Vec<(RuleType, String)>),

    /// Every declared export was dropped during analysis or resolution.
    #[error("No valid exports present in the npm exports")]
    NoValidExports,
}

fn format_duplicates(duplicates: &[(RuleType, String)]) -> String {
    duplicates
        .iter()
        .map(|(rule_type, id)| format!("{rule_type}:{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while constructing or looking up a single rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The `type` field is missing or names no known rule type.
    #[error("Invalid rule type ({0})")]
    InvalidType(String),

    /// The rule has no usable `id`.
    #[error("Invalid property - id {0}")]
    MissingId(String),

    /// A required per-kind property is missing or empty.
    #[error("Invalid property - {property} {context}")]
    MissingProperty {
        /// Name of the missing property.
        property: &'static str,
        /// Log context of the rule.
        context: String,
    },

    /// A filter rule sets none of its name predicates.
    #[error(
        "At least one of the properties should be set (fullnameLike, dirnameLike, filenameLike, basenameLike, extnameLike) {0}"
    )]
    NoPredicate(String),

    /// A string could not be compiled to a regular expression.
    #[error("Regex creation failed (pattern: {pattern}, reason: {reason})")]
    InvalidRegex {
        /// The pattern as written in the configuration.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A `#id` reference names no registered rule of the expected type.
    #[error("Unresolved rule reference '#{id}' (type: '{rule_type}')")]
    UnresolvedReference {
        /// The referenced id (without the leading `#`).
        id: String,
        /// Rule type the reference was expected to resolve to.
        rule_type: RuleType,
    },
}

/// Errors raised while resolving an export's deferred sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// After substitution, the pattern list has no positive glob.
    #[error("No positive source glob pattern specified (export: '{export}', package: '{package}')")]
    NoPositivePattern {
        /// Export being resolved.
        export: String,
        /// Package the patterns were resolved for.
        package: String,
    },

    /// A rule owned by the export failed to resolve.
    #[error("Failed to resolve {context}: {reason}")]
    Rule {
        /// Log context of the rule.
        context: String,
        /// Underlying reason.
        reason: String,
    },
}

/// Errors raised while a pipeline runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Processing a single file failed; the file is dropped.
    #[error("Failed to process file (path: '{path}', reason: '{reason}')")]
    File {
        /// Relative path of the file.
        path: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The pipeline cannot continue; its remaining output is omitted.
    #[error("Pipeline '{pipeline}' aborted: {reason}")]
    Aborted {
        /// Pipeline name (`<export> - <package>`).
        pipeline: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The package is not among the export's matched packages.
    #[error("The package does not exist in the node dependencies (export: '{export}', package: '{package}')")]
    UnknownPackage {
        /// Export name.
        export: String,
        /// Requested package.
        package: String,
    },
}
