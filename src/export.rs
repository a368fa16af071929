//! Export directives: which packages, which files, and which rule chain.
//!
//! An [`Export`] is created from a directive merged with the document's
//! default and append rules. Every rule it uses is an owned copy, so the
//! resolution caches filled by [`Export::resolve`] never leak between
//! exports that reference the same global rule.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::config::exports::{ExportDirective, ExportsConfig};
use crate::config::parse_enum;
use crate::context::TransformContext;
use crate::error::{PipelineError, ResolveError, RuleError};
use crate::glob::{FileStream, GlobEnumerator};
use crate::logging::Log;
use crate::operations::FileSystemOps;
use crate::pattern::{Pattern, replace_braced_glob_patterns};
use crate::pipeline::{Pipeline, Stage};
use crate::rules::{
    HierarchyAdjustment, Rule, RuleIds, RuleKind, RuleRegistry, RuleType, reference_id, split_items,
};

/// A validated export directive.
#[derive(Debug, Clone)]
pub struct Export {
    name: String,
    data: Value,
    packages: Vec<String>,
    source: Option<Rule>,
    filters: Vec<Rule>,
    renames: Vec<Rule>,
    replacements: Vec<Rule>,
    move_rule: Option<Rule>,
    overriding_move_package: Option<String>,
    hierarchy: Option<HierarchyAdjustment>,
}

impl Export {
    /// Build the export described by `data`.
    ///
    /// `from` items are matched against `module_names`; list fields fall back
    /// to the document defaults and are extended with its append rules.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid package matcher, an unknown `#id`
    /// reference, or an invalid inline rule.
    pub fn create(
        data: &Value,
        name: &str,
        config: &ExportsConfig,
        module_names: &[String],
        registry: &RuleRegistry,
        ids: &RuleIds,
        log: &dyn Log,
    ) -> Result<Self, RuleError> {
        let directive: ExportDirective = serde_json::from_value(data.clone()).unwrap_or_default();
        let defaults = &config.default_export_rules;
        let append = &config.append_export_rules;
        let context = format!("(export: '{name}')");
        log.debug(&format!("Creating export directive - '{name}' ({data})..."));

        log.debug(&format!("Analyzing package names... {context}"));
        let packages = match_packages(directive.from.as_deref(), module_names).inspect_err(|_| {
            log.warn(&format!(
                "Failed to convert package name string to RegExp {context}"
            ));
        })?;

        log.debug(&format!("Analyzing source rules... {context}"));
        let select = merged_items(
            directive.select.as_deref(),
            defaults.source.as_deref(),
            append.source.as_deref(),
            true,
        );
        let source = build_source(&select, registry, ids, name)?;

        log.debug(&format!("Analyzing filter rules... {context}"));
        let filters = build_list(
            RuleType::Filter,
            "fullnameLike",
            &merged_items(
                directive.filter.as_deref(),
                defaults.filter.as_deref(),
                append.filter.as_deref(),
                false,
            ),
            registry,
            ids,
            name,
        )?;

        log.debug(&format!("Analyzing rename rules... {context}"));
        let renames = build_list(
            RuleType::Rename,
            "with",
            &merged_items(
                directive.rename.as_deref(),
                defaults.rename.as_deref(),
                append.rename.as_deref(),
                false,
            ),
            registry,
            ids,
            name,
        )?;

        log.debug(&format!("Analyzing replace content rules... {context}"));
        let replacements = build_list(
            RuleType::ReplaceContent,
            "with",
            &merged_items(
                directive.replace_content.as_deref(),
                defaults.replace_content.as_deref(),
                append.replace_content.as_deref(),
                false,
            ),
            registry,
            ids,
            name,
        )?;

        log.debug(&format!("Analyzing move rules... {context}"));
        let move_rule = directive
            .move_to
            .as_deref()
            .or(defaults.move_to.as_deref())
            .map(|item| build_item(RuleType::Move, "to", item, registry, ids, name))
            .transpose()?;

        let hierarchy = parse_enum(directive.with_hierarchy.as_ref(), &HierarchyAdjustment::VARIANTS)
            .or_else(|| {
                parse_enum(
                    defaults.hierarchy_adjustment.as_ref(),
                    &HierarchyAdjustment::VARIANTS,
                )
            });

        Ok(Self {
            name: name.to_string(),
            data: data.clone(),
            packages,
            source,
            filters,
            renames,
            replacements,
            move_rule,
            overriding_move_package: directive.overriding_move_package_name,
            hierarchy,
        })
    }

    /// Resolve deferred values: per-package source patterns and the `if`
    /// conditions of rename and replace-content rules.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the export should then be excluded.
    pub fn resolve(
        &mut self,
        registry: &RuleRegistry,
        ids: &RuleIds,
        main_files: &(dyn Fn(&str) -> Option<Vec<String>> + Sync),
        log: &dyn Log,
    ) -> Result<(), ResolveError> {
        if let Some(RuleKind::Source(source)) = self.source.as_mut().map(Rule::kind_mut) {
            source.resolve(&self.name, &self.packages, main_files, log)?;
        }
        for rule in self.renames.iter_mut().chain(self.replacements.iter_mut()) {
            let context = rule.log_context(Some(&self.name));
            let result = match rule.kind_mut() {
                RuleKind::Rename(rename) => rename.resolve(registry, ids, &self.name),
                RuleKind::ReplaceContent(replace) => replace.resolve(registry, ids, &self.name),
                _ => Ok(()),
            };
            result.map_err(|e| ResolveError::Rule {
                context,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Assemble the pipeline for `package`.
    ///
    /// An export without a source yields an empty pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownPackage`] if `package` was not matched
    /// by this export and [`PipelineError::Aborted`] if the source or a
    /// stage cannot be created.
    pub fn create_pipeline(
        &self,
        package: &str,
        modules_dir: &Path,
        glob: &dyn GlobEnumerator,
        fs: Arc<dyn FileSystemOps>,
        log: Arc<dyn Log>,
    ) -> Result<Pipeline, PipelineError> {
        if !self.packages.iter().any(|p| p == package) {
            return Err(PipelineError::UnknownPackage {
                export: self.name.clone(),
                package: package.to_string(),
            });
        }
        let mut tctx = TransformContext::new(&self.name, package, fs, Arc::clone(&log));
        tctx.overriding_move_package.clone_from(&self.overriding_move_package);
        tctx.hierarchy = self.hierarchy;
        let aborted = |reason: String| PipelineError::Aborted {
            pipeline: tctx.pipeline_name(),
            reason,
        };

        let source: FileStream = match self.source_patterns(package) {
            Some(patterns) => glob
                .enumerate(patterns, &modules_dir.join(package))
                .map_err(|e| aborted(format!("{e:#}")))?,
            None if self.source.is_some() => {
                return Err(aborted("source patterns were not resolved".to_string()));
            }
            None => Box::new(std::iter::empty()),
        };

        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        for rule in self.rules() {
            if let Some(stage) = rule.create_stage(&tctx).map_err(|e| aborted(e.to_string()))? {
                stages.push(stage);
            }
        }
        Ok(Pipeline::new(&self.name, package, source, stages, log))
    }

    /// Export name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directive as written.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Matched package names, distinct, in match order.
    #[must_use]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Effective source rule.
    #[must_use]
    pub const fn source(&self) -> Option<&Rule> {
        self.source.as_ref()
    }

    /// Resolved source patterns for `package`.
    #[must_use]
    pub fn source_patterns(&self, package: &str) -> Option<&[String]> {
        match self.source.as_ref().map(Rule::kind) {
            Some(RuleKind::Source(source)) => source.patterns_for(package),
            _ => None,
        }
    }

    /// Transform rules in stage order: filters, renames, replace-content
    /// rules, then the move rule.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.filters
            .iter()
            .chain(&self.renames)
            .chain(&self.replacements)
            .chain(&self.move_rule)
    }

    /// Package name substituted into move destinations.
    #[must_use]
    pub fn overriding_move_package(&self) -> Option<&str> {
        self.overriding_move_package.as_deref()
    }

    /// Export-level hierarchy mode.
    #[must_use]
    pub const fn hierarchy(&self) -> Option<HierarchyAdjustment> {
        self.hierarchy
    }

    /// Log context, e.g. `(export: 'Vendor', package: 'lodash')`.
    #[must_use]
    pub fn log_context(&self, package: Option<&str>) -> String {
        match package {
            Some(package) => format!("(export: '{}', package: '{package}')", self.name),
            None => format!("(export: '{}')", self.name),
        }
    }
}

/// Package names matched by the comma-separated `from` list, distinct and
/// in match order.
fn match_packages(from: Option<&str>, module_names: &[String]) -> Result<Vec<String>, RuleError> {
    let mut packages: Vec<String> = Vec::new();
    for item in split_items(from.unwrap_or_default()) {
        let pattern = Pattern::parse(&item, true)?;
        for name in module_names.iter().filter(|n| pattern.is_match(n)) {
            if !packages.contains(name) {
                packages.push(name.clone());
            }
        }
    }
    Ok(packages)
}

/// The directive's own list (or the default when absent) followed by the
/// append list, split and de-duplicated.
fn merged_items(own: Option<&str>, default: Option<&str>, append: Option<&str>, braced: bool) -> Vec<String> {
    let joined = [own.or(default), append]
        .into_iter()
        .flatten()
        .map(|text| {
            if braced {
                replace_braced_glob_patterns(text)
            } else {
                text.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    split_items(&joined)
}

/// Resolve `#id` against `registry` or build an inline rule setting `field`.
fn build_item(
    rule_type: RuleType,
    field: &str,
    item: &str,
    registry: &RuleRegistry,
    ids: &RuleIds,
    export: &str,
) -> Result<Rule, RuleError> {
    match reference_id(item) {
        Some(id) => registry.require(id, rule_type).cloned(),
        None => Rule::inline(rule_type, field, item, ids, Some(export)),
    }
}

fn build_list(
    rule_type: RuleType,
    field: &str,
    items: &[String],
    registry: &RuleRegistry,
    ids: &RuleIds,
    export: &str,
) -> Result<Vec<Rule>, RuleError> {
    items
        .iter()
        .map(|item| build_item(rule_type, field, item, registry, ids, export))
        .collect()
}

/// One source rule for the whole `select` list. Several rules are merged
/// into a synthesized rule over their concatenated patterns.
fn build_source(
    items: &[String],
    registry: &RuleRegistry,
    ids: &RuleIds,
    export: &str,
) -> Result<Option<Rule>, RuleError> {
    let mut rules = build_list(RuleType::Source, "src", items, registry, ids, export)?;
    if rules.len() <= 1 {
        return Ok(rules.pop());
    }
    let patterns: Vec<&str> = rules
        .iter()
        .filter_map(|rule| match rule.kind() {
            RuleKind::Source(source) => Some(source.src()),
            _ => None,
        })
        .flatten()
        .map(String::as_str)
        .collect();
    Rule::inline(RuleType::Source, "src", &patterns.join(","), ids, Some(export)).map(Some)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, isolated_logger};
    use serde_json::json;

    fn registry() -> RuleRegistry {
        RuleRegistry::from_rules(
            [
                json!({"id": "js", "type": "source", "src": "**/*.js"}),
                json!({"id": "dts", "type": "source", "src": "**/*.d.ts,!test/**"}),
                json!({"id": "no-tests", "type": "filter", "fullnameLike": "/test/i"}),
                json!({"id": "ts", "type": "filter", "extnameLike": ".ts"}),
                json!({"id": "types", "type": "rename", "if": "#ts", "in": "dirName", "with": "types"}),
                json!({"id": "vendor", "type": "move", "to": "vendor/#package#", "withHierarchy": "flattened"}),
            ]
            .iter()
            .map(|v| Rule::from_value(v, None).unwrap())
            .collect(),
        )
    }

    fn modules() -> Vec<String> {
        ["lodash", "lodash.merge", "jquery", "@types/jquery"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn src(rule: &Rule) -> Vec<String> {
        match rule.kind() {
            RuleKind::Source(source) => source.src().to_vec(),
            _ => Vec::new(),
        }
    }

    fn create(data: &Value, config: &Value) -> Result<Export, RuleError> {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let config: ExportsConfig = serde_json::from_value(config.clone()).unwrap();
        Export::create(data, "Vendor", &config, &modules(), &registry(), &RuleIds::new(), &log)
    }

    #[test]
    fn from_items_match_names_in_order_without_duplicates() {
        let export = create(&json!({"from": "jquery, /^lodash/, lodash"}), &json!({})).unwrap();
        assert_eq!(export.packages(), ["jquery", "lodash", "lodash.merge"]);

        let export = create(&json!({"from": "*jquery"}), &json!({})).unwrap();
        assert_eq!(export.packages(), ["jquery", "@types/jquery"]);
        let export = create(&json!({"from": "@types/*"}), &json!({})).unwrap();
        assert_eq!(export.packages(), ["@types/jquery"]);
    }

    #[test]
    fn invalid_package_matcher_invalidates_the_export() {
        let err = create(&json!({"from": "/([/"}), &json!({})).unwrap_err();
        assert!(matches!(err, RuleError::InvalidRegex { .. }));
    }

    #[test]
    fn several_sources_merge_into_one_rule() {
        let export = create(
            &json!({"from": "lodash", "select": "#js, README.md, #dts"}),
            &json!({"appendExportRules": {"source": "LICENSE,README.md"}}),
        )
        .unwrap();
        let source = export.source().unwrap();
        assert!(source.id().starts_with("source-"));
        assert_eq!(
            src(source),
            ["**/*.js", "README.md", "**/*.d.ts", "!test/**", "LICENSE"]
        );
    }

    #[test]
    fn a_single_referenced_source_is_used_as_is() {
        let export = create(&json!({"from": "lodash", "select": "#js"}), &json!({})).unwrap();
        assert_eq!(export.source().unwrap().id(), "js");
        let export = create(&json!({"from": "lodash"}), &json!({})).unwrap();
        assert!(export.source().is_none());
    }

    #[test]
    fn package_token_items_are_inline_patterns() {
        let export = create(&json!({"from": "lodash", "select": "#package#.js"}), &json!({})).unwrap();
        let source = export.source().unwrap();
        assert!(source.id().starts_with("source-"));
        assert_eq!(src(source), ["#package#.js"]);

        let export = create(&json!({"from": "lodash", "filter": "#package#*"}), &json!({})).unwrap();
        let ids: Vec<_> = export.rules().map(Rule::id).collect();
        assert_eq!(ids.len(), 1);
        assert!(ids[0].starts_with("filter-"));
    }

    #[test]
    fn braces_survive_list_splitting() {
        let export = create(&json!({"from": "lodash", "select": "*.{js,ts}"}), &json!({})).unwrap();
        assert_eq!(src(export.source().unwrap()), ["*.@(js|ts)"]);
    }

    #[test]
    fn directive_values_replace_defaults_and_appends_extend_them() {
        let config = json!({
            "defaultExportRules": {"filter": "#ts", "move": "#vendor", "hierarchyAdjustment": "minimized"},
            "appendExportRules": {"filter": "#no-tests"}
        });
        let export = create(&json!({"from": "lodash", "filter": "*.js"}), &config).unwrap();
        let ids: Vec<_> = export.rules().map(Rule::id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids[0].starts_with("filter-"));
        assert_eq!(&ids[1..], ["no-tests", "vendor"]);
        assert_eq!(export.hierarchy(), Some(HierarchyAdjustment::Minimized));

        let export = create(&json!({"from": "lodash", "withHierarchy": "none"}), &config).unwrap();
        let ids: Vec<_> = export.rules().map(Rule::id).collect();
        assert_eq!(ids, ["ts", "no-tests", "vendor"]);
        assert_eq!(export.hierarchy(), Some(HierarchyAdjustment::None));
    }

    #[test]
    fn inline_items_build_rules_of_each_kind() {
        let export = create(
            &json!({
                "from": "lodash",
                "rename": "index.js",
                "replaceContent": "",
                "move": "out/#package#",
                "overridingMovePackageName": "_"
            }),
            &json!({}),
        )
        .unwrap();
        let types: Vec<_> = export.rules().map(Rule::rule_type).collect();
        assert_eq!(types, [RuleType::Rename, RuleType::Move]);
        assert_eq!(export.overriding_move_package(), Some("_"));
        assert_eq!(export.hierarchy(), None);
    }

    #[test]
    fn unknown_references_invalidate_the_export() {
        let err = create(&json!({"from": "lodash", "filter": "#nope"}), &json!({})).unwrap_err();
        assert_eq!(
            err,
            RuleError::UnresolvedReference {
                id: "nope".to_string(),
                rule_type: RuleType::Filter,
            }
        );
        assert!(create(&json!({"from": "lodash", "move": "#js"}), &json!({})).is_err());
    }

    #[test]
    fn resolution_is_per_export() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let registry = registry();
        let ids = RuleIds::new();
        let config = ExportsConfig::default();
        let mut a = Export::create(&json!({"from": "lodash", "select": "#js", "rename": "#types"}), "A", &config, &modules(), &registry, &ids, &log).unwrap();
        let b = Export::create(&json!({"from": "jquery", "select": "#js"}), "B", &config, &modules(), &registry, &ids, &log).unwrap();
        a.resolve(&registry, &ids, &|_| None, &log).unwrap();
        assert_eq!(a.source_patterns("lodash").unwrap(), ["**/*.js"]);
        assert!(b.source_patterns("jquery").is_none());
    }

    #[test]
    fn pipelines_only_exist_for_matched_packages() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let log: Arc<dyn Log> = Arc::new(log);
        let export = create(&json!({"from": "lodash"}), &json!({})).unwrap();
        let fs: Arc<dyn FileSystemOps> = Arc::new(crate::operations::MockFileSystemOps::new());
        let err = export
            .create_pipeline("jquery", Path::new("/nm"), &crate::glob::FsGlobEnumerator, Arc::clone(&fs), Arc::clone(&log))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownPackage { .. }));

        let pipeline = export
            .create_pipeline("lodash", Path::new("/nm"), &crate::glob::FsGlobEnumerator, fs, log)
            .unwrap();
        assert_eq!(pipeline.count(), 0);
    }
}
