//! Registry of globally declared rules, addressed by `(type, id)`.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{Rule, RuleType};
use crate::error::{ConfigError, RuleError};
use crate::logging::Log;

/// Validated global rules in declaration order.
///
/// Construction guarantees that no two rules share a `(type, id)` pair, so
/// [`RuleRegistry::resolve`] finds at most one rule.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    /// Build the registry from raw rule entries.
    ///
    /// Null entries are skipped. Entries with an unknown type or invalid
    /// fields are logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoValidRules`] when nothing survives validation
    /// and [`ConfigError::DuplicateRuleIds`] when ids collide within a type.
    pub fn build(entries: &[Value], log: &dyn Log) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();
        for entry in entries.iter().filter(|e| !e.is_null()) {
            match Rule::from_value(entry, None) {
                Ok(rule) => {
                    log.debug(&format!("Registered {}", rule.log_context(None)));
                    rules.push(rule);
                }
                Err(e @ RuleError::InvalidType(_)) => log.warn(&e.to_string()),
                Err(e) => log.error(&e.to_string()),
            }
        }
        if rules.is_empty() {
            return Err(ConfigError::NoValidRules);
        }

        log.debug("Analyzing duplicate rule ids...");
        let registry = Self::from_rules(rules);
        let duplicates = registry.duplicates();
        if duplicates.is_empty() {
            return Ok(registry);
        }
        for (rule_type, id) in &duplicates {
            log.error(&format!(
                "Duplicate rule id found (id: '{id}', type: '{rule_type}')"
            ));
        }
        Err(ConfigError::DuplicateRuleIds(duplicates))
    }

    /// Registry over already validated rules, without duplicate checks.
    #[must_use]
    pub const fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Every `(type, id)` pair used by more than one rule, sorted.
    #[must_use]
    pub fn duplicates(&self) -> Vec<(RuleType, String)> {
        let mut counts: BTreeMap<(RuleType, &str), usize> = BTreeMap::new();
        for rule in &self.rules {
            *counts.entry((rule.rule_type(), rule.id())).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|((rule_type, id), _)| (rule_type, id.to_string()))
            .collect()
    }

    /// Look up the rule of `rule_type` named `id`.
    #[must_use]
    pub fn resolve(&self, id: &str, rule_type: RuleType) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|rule| rule.rule_type() == rule_type && rule.id() == id)
    }

    /// Like [`resolve`](Self::resolve), failing for unknown references.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnresolvedReference`] if no rule matches.
    pub fn require(&self, id: &str, rule_type: RuleType) -> Result<&Rule, RuleError> {
        self.resolve(id, rule_type)
            .ok_or_else(|| RuleError::UnresolvedReference {
                id: id.to_string(),
                rule_type,
            })
    }

    /// Registered rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
