//! Rule model: the five rule kinds, the envelope they share, and the
//! registry of globally declared rules.
//!
//! Rules arrive as free-form JSON objects. [`Rule::from_value`] reads the
//! `type` field, builds the matching [`RuleKind`] payload, and validates it
//! before the rule is used anywhere.

mod filter;
mod move_rule;
mod registry;
mod rename;
mod replace_content;
mod source;

pub use filter::{FilterMatcher, FilterRule, FilterStage};
pub use move_rule::{HierarchyAdjustment, MoveRule, MoveStage};
pub use registry::RuleRegistry;
pub use rename::{RenameRule, RenameStage};
pub use replace_content::{ReplaceContentRule, ReplaceContentStage};
pub use source::SourceRule;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{parse_enum, text};
use crate::context::TransformContext;
use crate::error::RuleError;
use crate::pattern::{MAIN_TOKEN, PACKAGE_TOKEN};
use crate::pipeline::Stage;

/// Kind of a rule, as named by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    /// Selects the files of a package.
    Source,
    /// Keeps files whose names match.
    Filter,
    /// Rewrites part of a file's path.
    Rename,
    /// Rewrites file contents.
    ReplaceContent,
    /// Relocates files under a destination.
    Move,
    /// Reserved; never constructed.
    CheckChanges,
}

impl RuleType {
    /// Variant names in ordinal order, for configuration parsing.
    pub const VARIANTS: [(&'static str, Self); 6] = [
        ("Source", Self::Source),
        ("Filter", Self::Filter),
        ("Rename", Self::Rename),
        ("ReplaceContent", Self::ReplaceContent),
        ("Move", Self::Move),
        ("CheckChanges", Self::CheckChanges),
    ];

    /// Canonical name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Filter => "Filter",
            Self::Rename => "Rename",
            Self::ReplaceContent => "ReplaceContent",
            Self::Move => "Move",
            Self::CheckChanges => "CheckChanges",
        }
    }

    /// Lowercase name, used as the `type` of synthesized rules and as the
    /// prefix of generated ids.
    #[must_use]
    pub fn key(self) -> String {
        self.name().to_lowercase()
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw fields of a rule object. Values stay as JSON so that each kind can
/// read them with its own leniency.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RuleData {
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub rule_type: Option<Value>,
    pub src: Option<Value>,
    pub fullname_like: Option<Value>,
    pub dirname_like: Option<Value>,
    pub filename_like: Option<Value>,
    pub basename_like: Option<Value>,
    pub extname_like: Option<Value>,
    #[serde(rename = "if")]
    pub condition: Option<Value>,
    pub replace: Option<Value>,
    #[serde(rename = "in")]
    pub segment: Option<Value>,
    pub with: Option<Value>,
    pub to: Option<Value>,
    pub with_hierarchy: Option<Value>,
}

/// Per-kind payload of a rule.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// See [`SourceRule`].
    Source(SourceRule),
    /// See [`FilterRule`].
    Filter(FilterRule),
    /// See [`RenameRule`].
    Rename(RenameRule),
    /// See [`ReplaceContentRule`].
    ReplaceContent(ReplaceContentRule),
    /// See [`MoveRule`].
    Move(MoveRule),
}

impl RuleKind {
    /// Type tag of the payload.
    #[must_use]
    pub const fn rule_type(&self) -> RuleType {
        match self {
            Self::Source(_) => RuleType::Source,
            Self::Filter(_) => RuleType::Filter,
            Self::Rename(_) => RuleType::Rename,
            Self::ReplaceContent(_) => RuleType::ReplaceContent,
            Self::Move(_) => RuleType::Move,
        }
    }

    fn validate(&self, context: &str) -> Result<(), RuleError> {
        match self {
            Self::Source(rule) => rule.validate(context),
            Self::Filter(rule) => rule.validate(context),
            Self::Rename(rule) => rule.validate(context),
            Self::ReplaceContent(rule) => rule.validate(context),
            Self::Move(rule) => rule.validate(context),
        }
    }
}

/// A validated rule: an id, a payload, and the JSON it was built from.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    kind: RuleKind,
    data: Value,
}

impl Rule {
    /// Build and validate a rule from its JSON object.
    ///
    /// `export` only feeds the log context of errors.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidType`] when `type` is missing or unknown,
    /// [`RuleError::MissingId`] when `id` is blank, and the payload's own
    /// validation error otherwise.
    pub fn from_value(data: &Value, export: Option<&str>) -> Result<Self, RuleError> {
        let invalid_type = || RuleError::InvalidType(data.to_string());
        let fields: RuleData = serde_json::from_value(data.clone()).map_err(|_| invalid_type())?;
        let rule_type =
            parse_enum(fields.rule_type.as_ref(), &RuleType::VARIANTS).ok_or_else(invalid_type)?;
        let id = text(fields.id.as_ref());
        let context = context_info(export, Some(rule_type), id.as_deref(), data);

        let kind = match rule_type {
            RuleType::Source => RuleKind::Source(SourceRule::from_data(&fields)),
            RuleType::Filter => RuleKind::Filter(FilterRule::from_data(&fields)),
            RuleType::Rename => RuleKind::Rename(RenameRule::from_data(&fields)),
            RuleType::ReplaceContent => {
                RuleKind::ReplaceContent(ReplaceContentRule::from_data(&fields))
            }
            RuleType::Move => RuleKind::Move(MoveRule::from_data(&fields)),
            RuleType::CheckChanges => return Err(invalid_type()),
        };
        let id = id.ok_or_else(|| RuleError::MissingId(context.clone()))?;
        kind.validate(&context)?;
        Ok(Self {
            id,
            kind,
            data: data.clone(),
        })
    }

    /// Build a rule of `rule_type` with a generated id and a single field.
    ///
    /// # Errors
    ///
    /// Returns the payload's validation error.
    pub fn inline(
        rule_type: RuleType,
        field: &str,
        value: &str,
        ids: &RuleIds,
        export: Option<&str>,
    ) -> Result<Self, RuleError> {
        let mut data = Map::new();
        data.insert("id".to_string(), Value::String(ids.next(rule_type)));
        data.insert("type".to_string(), Value::String(rule_type.key()));
        data.insert(field.to_string(), Value::String(value.to_string()));
        Self::from_value(&Value::Object(data), export)
    }

    /// Rule id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rule type.
    #[must_use]
    pub const fn rule_type(&self) -> RuleType {
        self.kind.rule_type()
    }

    /// Payload.
    #[must_use]
    pub const fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Mutable payload, for resolution caches.
    pub const fn kind_mut(&mut self) -> &mut RuleKind {
        &mut self.kind
    }

    /// The JSON the rule was built from.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Log context, e.g. `(export: 'Vendor', type: 'Filter rule', id: 'no-tests')`.
    #[must_use]
    pub fn log_context(&self, export: Option<&str>) -> String {
        context_info(export, Some(self.rule_type()), Some(&self.id), &self.data)
    }

    /// Create the pipeline stage for this rule.
    ///
    /// Source rules feed a pipeline rather than transform it and yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if a package-specific pattern does not compile.
    pub fn create_stage(&self, tctx: &TransformContext) -> Result<Option<Box<dyn Stage>>, RuleError> {
        let context = self.log_context(Some(&tctx.export));
        let stage: Box<dyn Stage> = match &self.kind {
            RuleKind::Source(_) => return Ok(None),
            RuleKind::Filter(rule) => Box::new(FilterStage::new(rule, tctx, context)?),
            RuleKind::Rename(rule) => Box::new(RenameStage::new(rule, tctx, context)?),
            RuleKind::ReplaceContent(rule) => Box::new(ReplaceContentStage::new(rule, tctx, context)?),
            RuleKind::Move(rule) => Box::new(MoveStage::new(rule, tctx, context)),
        };
        Ok(Some(stage))
    }
}

/// Generator of `<type>-<n>` ids for synthesized rules, unique per run.
#[derive(Debug, Default)]
pub struct RuleIds(AtomicUsize);

impl RuleIds {
    /// Fresh generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for `rule_type`.
    pub fn next(&self, rule_type: RuleType) -> String {
        let n = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", rule_type.key())
    }
}

/// Format a rule's log context. Rules without an id show their data instead.
#[must_use]
pub fn context_info(
    export: Option<&str>,
    rule_type: Option<RuleType>,
    id: Option<&str>,
    data: &Value,
) -> String {
    let mut parts = Vec::new();
    if let Some(export) = export.map(str::trim).filter(|e| !e.is_empty()) {
        parts.push(format!("export: '{export}'"));
    }
    parts.push(format!(
        "type: '{} rule'",
        rule_type.map_or("Unknown", RuleType::name)
    ));
    match id {
        Some(id) => parts.push(format!("id: '{id}'")),
        None => parts.push(format!("data: '{data}'")),
    }
    format!("({})", parts.join(", "))
}

/// The rule id an `#id` list item refers to.
///
/// Items opening with `#package#` or `#main#` are patterns, not references.
#[must_use]
pub fn reference_id(item: &str) -> Option<&str> {
    if item.starts_with(PACKAGE_TOKEN) || item == MAIN_TOKEN {
        return None;
    }
    item.strip_prefix('#')
}

/// Split a comma-separated list into trimmed, non-blank, distinct items,
/// keeping first occurrences in order.
#[must_use]
pub fn split_items(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}
