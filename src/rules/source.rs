//! Source rules: the glob patterns that select a package's files.

use std::collections::HashMap;

use super::RuleData;
use crate::config::text;
use crate::error::{ResolveError, RuleError};
use crate::logging::Log;
use crate::pattern::{MAIN_TOKEN, replace_package_token};

/// Ordered glob patterns; `!` negates, `#main#` stands for the package's
/// published file list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRule {
    src: Vec<String>,
    resolved: HashMap<String, Vec<String>>,
}

impl SourceRule {
    pub(crate) fn from_data(data: &RuleData) -> Self {
        Self::from_patterns(
            text(data.src.as_ref())
                .unwrap_or_default()
                .split(',')
                .map(str::to_string),
        )
    }

    /// Rule over `patterns`; blank patterns are dropped.
    #[must_use]
    pub fn from_patterns(patterns: impl IntoIterator<Item = String>) -> Self {
        Self {
            src: patterns
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            resolved: HashMap::new(),
        }
    }

    pub(crate) fn validate(&self, context: &str) -> Result<(), RuleError> {
        if self.src.is_empty() {
            return Err(RuleError::MissingProperty {
                property: "src",
                context: context.to_string(),
            });
        }
        Ok(())
    }

    /// Patterns as declared.
    #[must_use]
    pub fn src(&self) -> &[String] {
        &self.src
    }

    /// Resolve the pattern list of every package in `packages`.
    ///
    /// `#main#` is replaced by the list `main_files` returns for the package;
    /// when it returns `None` the token is dropped with a warning. `#package#`
    /// is then substituted. Packages already resolved are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoPositivePattern`] when a package's list has
    /// no pattern without a leading `!`.
    pub fn resolve(
        &mut self,
        export: &str,
        packages: &[String],
        main_files: &(dyn Fn(&str) -> Option<Vec<String>> + Sync),
        log: &dyn Log,
    ) -> Result<(), ResolveError> {
        for package in packages {
            if self.resolved.contains_key(package) {
                continue;
            }
            let mut patterns = Vec::with_capacity(self.src.len());
            for pattern in &self.src {
                if pattern != MAIN_TOKEN {
                    patterns.push(replace_package_token(pattern, Some(package), false));
                    continue;
                }
                match main_files(package) {
                    Some(files) => patterns.extend(files),
                    None => log.warn(&format!(
                        "Main files not found in package.json! (export: '{export}', package: '{package}')"
                    )),
                }
            }
            if !has_positive_pattern(&patterns) {
                return Err(ResolveError::NoPositivePattern {
                    export: export.to_string(),
                    package: package.clone(),
                });
            }
            log.debug(&format!(
                "Resolved source patterns (export: '{export}', package: '{package}', src: '{}')",
                patterns.join(",")
            ));
            self.resolved.insert(package.clone(), patterns);
        }
        Ok(())
    }

    /// Resolved patterns for `package`, if [`resolve`](Self::resolve) covered it.
    #[must_use]
    pub fn patterns_for(&self, package: &str) -> Option<&[String]> {
        self.resolved.get(package).map(Vec::as_slice)
    }
}

fn has_positive_pattern(patterns: &[String]) -> bool {
    patterns.iter().any(|p| !p.starts_with('!'))
}
