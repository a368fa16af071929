//! Rename rules: rewrite one segment of a file's destination path.

use std::sync::Arc;

use super::filter::resolve_conditions;
use super::{FilterMatcher, FilterRule, RuleData, RuleIds, RuleRegistry};
use crate::config::{parse_enum, text, text_allow_empty};
use crate::context::TransformContext;
use crate::error::{PipelineError, RuleError};
use crate::file::{FileRecord, NameSegment};
use crate::logging::Log;
use crate::pattern::{Pattern, WHOLE_NAME, replace_package_token};
use crate::pipeline::{Outbox, Stage};

/// Replace `replace` with `with` inside the `in` segment of the path, for
/// files passing every `if` filter.
#[derive(Debug, Clone, Default)]
pub struct RenameRule {
    condition: Option<String>,
    replace: Option<String>,
    segment: NameSegment,
    with: Option<String>,
    conditions: Vec<FilterRule>,
}

impl RenameRule {
    pub(crate) fn from_data(data: &RuleData) -> Self {
        Self {
            condition: text(data.condition.as_ref()),
            replace: text(data.replace.as_ref()),
            segment: parse_enum(data.segment.as_ref(), &NameSegment::VARIANTS).unwrap_or_default(),
            with: text_allow_empty(data.with.as_ref()),
            conditions: Vec::new(),
        }
    }

    pub(crate) fn validate(&self, context: &str) -> Result<(), RuleError> {
        if self.with.is_none() {
            return Err(RuleError::MissingProperty {
                property: "with",
                context: context.to_string(),
            });
        }
        self.compile(None).map(|_| ())
    }

    fn compile(&self, package: Option<&str>) -> Result<Pattern, RuleError> {
        let replace = self.replace.as_deref().unwrap_or(WHOLE_NAME);
        Pattern::parse(&replace_package_token(replace, package, false), true)
    }

    /// The `if` list as declared.
    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// The match expression as declared.
    #[must_use]
    pub fn replace(&self) -> Option<&str> {
        self.replace.as_deref()
    }

    /// Segment of the path being rewritten.
    #[must_use]
    pub const fn segment(&self) -> NameSegment {
        self.segment
    }

    /// Replacement text as declared.
    #[must_use]
    pub fn with(&self) -> &str {
        self.with.as_deref().unwrap_or_default()
    }

    /// Resolve the `if` list against `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown `#id` references and invalid inline filters.
    pub fn resolve(&mut self, registry: &RuleRegistry, ids: &RuleIds, export: &str) -> Result<(), RuleError> {
        self.conditions = resolve_conditions(self.condition.as_deref(), registry, ids, export)?;
        Ok(())
    }
}

/// Pipeline stage applying a [`RenameRule`].
#[derive(Debug)]
pub struct RenameStage {
    conditions: Vec<FilterMatcher>,
    replace: Pattern,
    with: String,
    segment: NameSegment,
    context: String,
    log: Arc<dyn Log>,
}

impl RenameStage {
    /// Stage for `rule` in the pipeline described by `tctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile for the package.
    pub fn new(rule: &RenameRule, tctx: &TransformContext, context: String) -> Result<Self, RuleError> {
        let package = Some(tctx.package.as_str());
        Ok(Self {
            conditions: rule
                .conditions
                .iter()
                .map(|c| c.compile(package))
                .collect::<Result<_, _>>()?,
            replace: rule.compile(package)?,
            with: replace_package_token(rule.with(), package, false),
            segment: rule.segment,
            context,
            log: Arc::clone(&tctx.log),
        })
    }
}

impl Stage for RenameStage {
    fn label(&self) -> &'static str {
        "RENAME"
    }

    fn transform(&mut self, mut file: FileRecord, out: &mut Outbox) -> Result<(), PipelineError> {
        self.log
            .debug(&format!("Input file ({}) {}", file.display_path(), self.context));
        if self.conditions.iter().all(|c| c.matches(&file)) {
            let renamed = self.replace.replace(&file.segment(self.segment), &self.with);
            file.set_segment(self.segment, &renamed);
        }
        out.push(file);
        Ok(())
    }
}
