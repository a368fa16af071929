//! Command: resolve every export and print the plan without touching files.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::commands::CommandSetup;
use crate::context::ExecutionContext;
use crate::export::Export;
use crate::logging::Logger;
use crate::rules::{Rule, RuleKind};

/// Run the `check` subcommand.
///
/// # Errors
///
/// Returns an error if initialization fails or the plan cannot be written to
/// stdout.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let plan = render_plan(&setup.context);
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{plan}")?;
    log.success("Export plan resolved");
    Ok(())
}

/// Render the resolved exports: matched packages, per-package source
/// patterns, and the stage chain of each export.
#[must_use]
pub fn render_plan(context: &ExecutionContext) -> String {
    let mut lines = vec![format!(
        "{} exports over {} dependencies",
        context.exports().len(),
        context.module_names().len()
    )];
    for export in context.exports() {
        render_export(export, &mut lines);
    }
    lines.push(String::new());
    lines.join("\n")
}

fn render_export(export: &Export, lines: &mut Vec<String>) {
    lines.push(String::new());
    lines.push(format!("export '{}'", export.name()));
    if export.packages().is_empty() {
        lines.push("  packages: (none)".to_string());
    } else {
        lines.push(format!("  packages: {}", export.packages().join(", ")));
    }
    if let Some(package) = export.overriding_move_package() {
        lines.push(format!("  move package: {package}"));
    }

    let source = export.source();
    lines.push(source.map_or_else(
        || "  source: (none)".to_string(),
        |rule| format!("  source: {} [{}]", rule.id(), describe(rule, export)),
    ));
    if source.is_some() {
        for package in export.packages() {
            let patterns = export
                .source_patterns(package)
                .map_or_else(String::new, |p| p.join(", "));
            lines.push(format!("    {package}: {patterns}"));
        }
    }

    let stages: Vec<&Rule> = export.rules().collect();
    if stages.is_empty() {
        lines.push("  stages: (none)".to_string());
        return;
    }
    lines.push("  stages:".to_string());
    for (n, rule) in stages.iter().enumerate() {
        lines.push(format!(
            "    {}. {} {}: {}",
            n + 1,
            rule.rule_type(),
            rule.id(),
            describe(rule, export)
        ));
    }
}

fn describe(rule: &Rule, export: &Export) -> String {
    match rule.kind() {
        RuleKind::Source(source) => source.src().join(", "),
        RuleKind::Filter(filter) => filter.describe(),
        RuleKind::Rename(rename) => conditional(
            &format!(
                "in {:?} replace {} with '{}'",
                rename.segment(),
                quoted(rename.replace()),
                rename.with()
            ),
            rename.condition(),
        ),
        RuleKind::ReplaceContent(replace) => conditional(
            &format!("replace {} with '{}'", quoted(replace.replace()), replace.with()),
            replace.condition(),
        ),
        RuleKind::Move(to) => format!(
            "to '{}' ({})",
            to.to(),
            export.hierarchy().unwrap_or(to.hierarchy()).name()
        ),
    }
}

fn quoted(value: Option<&str>) -> String {
    value.map_or_else(|| "everything".to_string(), |v| format!("'{v}'"))
}

fn conditional(text: &str, condition: Option<&str>) -> String {
    condition.map_or_else(|| text.to_string(), |c| format!("{text} if '{c}'"))
}
