//! Move rules: relocate files under a destination directory.

use std::sync::Arc;

use super::RuleData;
use crate::config::{parse_enum, text};
use crate::context::TransformContext;
use crate::error::{PipelineError, RuleError};
use crate::file::FileRecord;
use crate::logging::Log;
use crate::paths;
use crate::pattern::{find_common_segment, remove_common_segment, replace_package_token};
use crate::pipeline::{Outbox, Stage};

/// How much of a file's directory structure survives a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyAdjustment {
    /// Keep the full relative path.
    #[default]
    None,
    /// Strip the directory prefix shared by every moved file.
    Minimized,
    /// Keep the file name only.
    Flattened,
}

impl HierarchyAdjustment {
    /// Variant names in ordinal order, for configuration parsing.
    pub const VARIANTS: [(&'static str, Self); 3] = [
        ("None", Self::None),
        ("Minimized", Self::Minimized),
        ("Flattened", Self::Flattened),
    ];

    /// Canonical name of the mode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Minimized => "Minimized",
            Self::Flattened => "Flattened",
        }
    }
}

/// Destination directory (`to`) and the default hierarchy mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveRule {
    to: Option<String>,
    hierarchy: HierarchyAdjustment,
}

impl MoveRule {
    pub(crate) fn from_data(data: &RuleData) -> Self {
        Self {
            to: text(data.to.as_ref()),
            hierarchy: parse_enum(data.with_hierarchy.as_ref(), &HierarchyAdjustment::VARIANTS)
                .unwrap_or_default(),
        }
    }

    pub(crate) fn validate(&self, context: &str) -> Result<(), RuleError> {
        if self.to.is_none() {
            return Err(RuleError::MissingProperty {
                property: "to",
                context: context.to_string(),
            });
        }
        Ok(())
    }

    /// Destination as declared, `#package#` unexpanded.
    #[must_use]
    pub fn to(&self) -> &str {
        self.to.as_deref().unwrap_or_default()
    }

    /// Mode used when the export does not override it.
    #[must_use]
    pub const fn hierarchy(&self) -> HierarchyAdjustment {
        self.hierarchy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveState {
    Collecting,
    Flushing,
    Done,
}

/// Pipeline stage applying a [`MoveRule`].
///
/// `None` relocates files and directories as they arrive. `Flattened`
/// relocates files by name and drops directories. `Minimized` holds every
/// file until the input ends, then strips the common directory prefix and
/// emits the batch in arrival order.
#[derive(Debug)]
pub struct MoveStage {
    to: String,
    mode: HierarchyAdjustment,
    state: MoveState,
    held: Vec<FileRecord>,
    pipeline: String,
    context: String,
    log: Arc<dyn Log>,
}

impl MoveStage {
    /// Stage for `rule` in the pipeline described by `tctx`.
    ///
    /// The export's hierarchy setting, when present, overrides the rule's.
    #[must_use]
    pub fn new(rule: &MoveRule, tctx: &TransformContext, context: String) -> Self {
        Self {
            to: replace_package_token(rule.to(), Some(tctx.move_package()), true),
            mode: tctx.hierarchy.unwrap_or(rule.hierarchy),
            state: MoveState::Collecting,
            held: Vec::new(),
            pipeline: tctx.pipeline_name(),
            context,
            log: Arc::clone(&tctx.log),
        }
    }

    /// Effective hierarchy mode.
    #[must_use]
    pub const fn mode(&self) -> HierarchyAdjustment {
        self.mode
    }

    fn aborted(&self, reason: &str) -> PipelineError {
        PipelineError::Aborted {
            pipeline: self.pipeline.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Stage for MoveStage {
    fn label(&self) -> &'static str {
        "MOVE"
    }

    fn transform(&mut self, mut file: FileRecord, out: &mut Outbox) -> Result<(), PipelineError> {
        if self.state != MoveState::Collecting {
            return Err(self.aborted("input received after the move stage flushed"));
        }
        self.log
            .debug(&format!("Input file ({}) {}", file.display_path(), self.context));
        match (self.mode, file.is_directory()) {
            (HierarchyAdjustment::None, _) => {
                let relocated = paths::join(&self.to, file.relative());
                file.set_relative(&relocated);
                out.push(file);
            }
            (_, true) => {}
            (HierarchyAdjustment::Flattened, false) => {
                let relocated = paths::join(&self.to, file.basename());
                file.set_relative(&relocated);
                out.push(file);
            }
            (HierarchyAdjustment::Minimized, false) => self.held.push(file),
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Outbox) -> Result<(), PipelineError> {
        if self.state != MoveState::Collecting {
            return Err(self.aborted("move stage flushed twice"));
        }
        self.state = MoveState::Flushing;
        if !self.held.is_empty() {
            let dirs: Vec<String> = self.held.iter().map(FileRecord::dirname).collect();
            let common = find_common_segment(&dirs).unwrap_or_default();
            self.log.debug(&format!(
                "Minimizing {} files (common segment: '{common}') {}",
                self.held.len(),
                self.context
            ));
            let to = &self.to;
            out.push_all(self.held.drain(..).map(|mut file| {
                let rebased = remove_common_segment(file.relative(), &common);
                file.set_relative(&paths::join(to, &rebased));
                file
            }));
        }
        self.state = MoveState::Done;
        Ok(())
    }
}
