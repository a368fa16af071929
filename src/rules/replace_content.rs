//! Replace-content rules: rewrite the text of matching files.

use std::sync::Arc;

use super::filter::resolve_conditions;
use super::{FilterMatcher, FilterRule, RuleData, RuleIds, RuleRegistry};
use crate::config::{text, text_allow_empty};
use crate::context::TransformContext;
use crate::error::{PipelineError, RuleError};
use crate::file::FileRecord;
use crate::logging::Log;
use crate::operations::FileSystemOps;
use crate::pattern::{Pattern, WHOLE_CONTENT, replace_package_token};
use crate::pipeline::{Outbox, Stage};

/// Replace `replace` with `with` in the contents of files passing every
/// `if` filter. Without `replace` the whole content is substituted.
#[derive(Debug, Clone, Default)]
pub struct ReplaceContentRule {
    condition: Option<String>,
    replace: Option<String>,
    with: Option<String>,
    conditions: Vec<FilterRule>,
}

impl ReplaceContentRule {
    pub(crate) fn from_data(data: &RuleData) -> Self {
        Self {
            condition: text(data.condition.as_ref()),
            replace: text(data.replace.as_ref()),
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
        let replace = self.replace.as_deref().unwrap_or(WHOLE_CONTENT);
        Pattern::parse(&replace_package_token(replace, package, false), false)
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

/// Pipeline stage applying a [`ReplaceContentRule`].
///
/// Directories and files failing a condition pass through untouched.
#[derive(Debug)]
pub struct ReplaceContentStage {
    conditions: Vec<FilterMatcher>,
    replace: Pattern,
    with: String,
    context: String,
    fs: Arc<dyn FileSystemOps>,
    log: Arc<dyn Log>,
}

impl ReplaceContentStage {
    /// Stage for `rule` in the pipeline described by `tctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile for the package.
    pub fn new(
        rule: &ReplaceContentRule,
        tctx: &TransformContext,
        context: String,
    ) -> Result<Self, RuleError> {
        let package = Some(tctx.package.as_str());
        Ok(Self {
            conditions: rule
                .conditions
                .iter()
                .map(|c| c.compile(package))
                .collect::<Result<_, _>>()?,
            replace: rule.compile(package)?,
            with: replace_package_token(rule.with(), package, false),
            context,
            fs: Arc::clone(&tctx.fs),
            log: Arc::clone(&tctx.log),
        })
    }

    fn rewrite(&self, file: &mut FileRecord) -> Result<(), PipelineError> {
        let path = file.source().display().to_string();
        let file_error = |reason: String| PipelineError::File {
            path: path.clone(),
            reason,
        };
        let bytes = file
            .load_contents(self.fs.as_ref())
            .map_err(|e| file_error(e.to_string()))?;
        let contents = std::str::from_utf8(bytes).map_err(|e| file_error(e.to_string()))?;
        let replaced = self.replace.replace(contents, &self.with);
        file.set_contents(replaced.into_bytes());
        Ok(())
    }
}

impl Stage for ReplaceContentStage {
    fn label(&self) -> &'static str {
        "REPLACE CONTENT"
    }

    fn transform(&mut self, mut file: FileRecord, out: &mut Outbox) -> Result<(), PipelineError> {
        self.log
            .debug(&format!("Input file ({}) {}", file.display_path(), self.context));
        if !file.is_directory() && self.conditions.iter().all(|c| c.matches(&file)) {
            self.rewrite(&mut file)?;
        }
        out.push(file);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, isolated_logger};
    use crate::operations::MockFileSystemOps;
    use serde_json::json;

    fn rule(data: serde_json::Value) -> ReplaceContentRule {
        let data: RuleData = serde_json::from_value(data).unwrap();
        ReplaceContentRule::from_data(&data)
    }

    type Guards = (tempfile::TempDir, tracing::dispatcher::DefaultGuard);

    fn stage(rule: &ReplaceContentRule, fs: MockFileSystemOps) -> (ReplaceContentStage, Guards) {
        let (log, dir, guard) = isolated_logger(LogLevel::Debug);
        let tctx = TransformContext::new("Vendor", "lodash", Arc::new(fs), Arc::new(log));
        (ReplaceContentStage::new(rule, &tctx, String::new()).unwrap(), (dir, guard))
    }

    fn contents(out: &mut Outbox) -> String {
        String::from_utf8(out.pop().unwrap().contents().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn with_is_required() {
        assert!(rule(json!({"replace": "a"})).validate("(ctx)").is_err());
        assert!(rule(json!({"with": ""})).validate("(ctx)").is_ok());
    }

    #[test]
    fn literal_matches_are_replaced_everywhere() {
        let fs = MockFileSystemOps::new().with_file("/pkg/a.js", "require('x'); require('x');");
        let (mut stage, _guards) = stage(&rule(json!({"replace": "'x'", "with": "'y'"})), fs);
        let mut out = Outbox::new();
        stage.transform(FileRecord::new("/pkg", "a.js", false), &mut out).unwrap();
        assert_eq!(contents(&mut out), "require('y'); require('y');");
    }

    #[test]
    fn missing_replace_substitutes_the_whole_content() {
        let fs = MockFileSystemOps::new().with_file("/pkg/a.txt", "line1\nline2\n");
        let (mut stage, _guards) = stage(&rule(json!({"with": "/* #package# */"})), fs);
        let mut out = Outbox::new();
        stage.transform(FileRecord::new("/pkg", "a.txt", false), &mut out).unwrap();
        assert_eq!(contents(&mut out), "/* lodash */");
    }

    #[test]
    fn directories_and_unmatched_files_pass_untouched() {
        let registry = RuleRegistry::default();
        let mut r = rule(json!({"if": "*.js", "with": "x"}));
        r.resolve(&registry, &RuleIds::new(), "Vendor").unwrap();
        let fs = MockFileSystemOps::new().with_file("/pkg/a.md", "doc");
        let (mut stage, _guards) = stage(&r, fs);
        let mut out = Outbox::new();
        stage.transform(FileRecord::new("/pkg", "lib", true), &mut out).unwrap();
        stage.transform(FileRecord::new("/pkg", "a.md", false), &mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert!(std::iter::from_fn(|| out.pop()).all(|f| !f.has_contents()));
    }

    #[test]
    fn binary_contents_are_a_file_error() {
        let fs = MockFileSystemOps::new().with_file("/pkg/a.bin", vec![0xff, 0xfe, 0x00]);
        let (mut stage, _guards) = stage(&rule(json!({"with": "x"})), fs);
        let mut out = Outbox::new();
        let err = stage
            .transform(FileRecord::new("/pkg", "a.bin", false), &mut out)
            .unwrap_err();
        assert!(matches!(err, PipelineError::File { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn unreadable_files_are_a_file_error() {
        let (mut stage, _guards) = stage(&rule(json!({"with": "x"})), MockFileSystemOps::new());
        let mut out = Outbox::new();
        let err = stage
            .transform(FileRecord::new("/pkg", "gone.js", false), &mut out)
            .unwrap_err();
        assert!(matches!(err, PipelineError::File { .. }));
    }
}
