//! Filter rules: keep files whose name parts match every set predicate.

use std::sync::Arc;

use super::{
    Rule, RuleData, RuleIds, RuleKind, RuleRegistry, RuleType, reference_id, split_items,
};
use crate::config::text;
use crate::context::TransformContext;
use crate::error::{PipelineError, RuleError};
use crate::file::{FileRecord, NameSegment};
use crate::logging::Log;
use crate::pattern::{Pattern, replace_package_token};
use crate::pipeline::{Outbox, Stage};

/// Name predicates; a file passes when every set predicate matches.
///
/// Each predicate is a literal (with `*` and `?` wildcards) or a
/// `/pattern/flags` regex and may contain `#package#`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRule {
    fullname_like: Option<String>,
    dirname_like: Option<String>,
    filename_like: Option<String>,
    basename_like: Option<String>,
    extname_like: Option<String>,
}

impl FilterRule {
    pub(crate) fn from_data(data: &RuleData) -> Self {
        Self {
            fullname_like: text(data.fullname_like.as_ref()),
            dirname_like: text(data.dirname_like.as_ref()),
            filename_like: text(data.filename_like.as_ref()),
            basename_like: text(data.basename_like.as_ref()),
            extname_like: text(data.extname_like.as_ref()),
        }
    }

    fn predicates(&self) -> impl Iterator<Item = (&'static str, NameSegment, &str)> {
        [
            ("fullnameLike", NameSegment::FullName, &self.fullname_like),
            ("dirnameLike", NameSegment::DirName, &self.dirname_like),
            ("filenameLike", NameSegment::FileName, &self.filename_like),
            ("basenameLike", NameSegment::BaseName, &self.basename_like),
            ("extnameLike", NameSegment::ExtName, &self.extname_like),
        ]
        .into_iter()
        .filter_map(|(name, segment, value)| value.as_deref().map(|v| (name, segment, v)))
    }

    pub(crate) fn validate(&self, context: &str) -> Result<(), RuleError> {
        if self.predicates().next().is_none() {
            return Err(RuleError::NoPredicate(context.to_string()));
        }
        self.compile(None).map(|_| ())
    }

    /// Compile the predicates for `package`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRegex`] if a predicate does not compile.
    pub fn compile(&self, package: Option<&str>) -> Result<FilterMatcher, RuleError> {
        let tests = self
            .predicates()
            .map(|(_, segment, value)| {
                Pattern::parse(&replace_package_token(value, package, false), true)
                    .map(|pattern| (segment, pattern))
            })
            .collect::<Result<_, _>>()?;
        Ok(FilterMatcher { tests })
    }

    /// Human-readable predicate list, e.g. `filenameLike '*.ts' AND extnameLike '.ts'`.
    #[must_use]
    pub fn describe(&self) -> String {
        self.predicates()
            .map(|(name, _, value)| format!("{name} '{value}'"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Compiled [`FilterRule`] for one package.
#[derive(Debug, Clone)]
pub struct FilterMatcher {
    tests: Vec<(NameSegment, Pattern)>,
}

impl FilterMatcher {
    /// Whether every predicate matches its part of `file`'s destination path.
    #[must_use]
    pub fn matches(&self, file: &FileRecord) -> bool {
        self.tests
            .iter()
            .all(|(segment, pattern)| pattern.is_match(&file.segment(*segment)))
    }
}

/// Resolve a comma-separated `if` list into filter rules.
///
/// `#id` items name a registered filter rule; anything else becomes an
/// inline `fullnameLike` filter.
///
/// # Errors
///
/// Returns [`RuleError::UnresolvedReference`] for an unknown `#id` and the
/// validation error of an invalid inline filter.
pub fn resolve_conditions(
    spec: Option<&str>,
    registry: &RuleRegistry,
    ids: &RuleIds,
    export: &str,
) -> Result<Vec<FilterRule>, RuleError> {
    let Some(spec) = spec else {
        return Ok(Vec::new());
    };
    split_items(spec)
        .iter()
        .map(|item| {
            let rule = match reference_id(item) {
                Some(id) => registry.require(id, RuleType::Filter)?.clone(),
                None => Rule::inline(RuleType::Filter, "fullnameLike", item, ids, Some(export))?,
            };
            match rule.kind {
                RuleKind::Filter(filter) => Ok(filter),
                _ => Err(RuleError::UnresolvedReference {
                    id: rule.id,
                    rule_type: RuleType::Filter,
                }),
            }
        })
        .collect()
}

/// Pipeline stage dropping files that do not match a [`FilterRule`].
#[derive(Debug)]
pub struct FilterStage {
    matcher: FilterMatcher,
    context: String,
    log: Arc<dyn Log>,
}

impl FilterStage {
    /// Stage for `rule` in the pipeline described by `tctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if a predicate does not compile for the package.
    pub fn new(rule: &FilterRule, tctx: &TransformContext, context: String) -> Result<Self, RuleError> {
        Ok(Self {
            matcher: rule.compile(Some(&tctx.package))?,
            context,
            log: Arc::clone(&tctx.log),
        })
    }
}

impl Stage for FilterStage {
    fn label(&self) -> &'static str {
        "FILTER"
    }

    fn transform(&mut self, file: FileRecord, out: &mut Outbox) -> Result<(), PipelineError> {
        self.log
            .debug(&format!("Input file ({}) {}", file.display_path(), self.context));
        if self.matcher.matches(&file) {
            out.push(file);
        }
        Ok(())
    }
}
