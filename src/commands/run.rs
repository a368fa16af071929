//! Command: run every export and write the results under a destination.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, RunOpts};
use crate::commands::CommandSetup;
use crate::file::FileRecord;
use crate::logging::{ExportStatus, Logger};

/// Writes pipeline output below a destination directory.
#[derive(Debug)]
pub struct Destination {
    root: PathBuf,
    dry_run: bool,
}

impl Destination {
    /// Writer rooted at `root`; with `dry_run` nothing touches the disk.
    #[must_use]
    pub const fn new(root: PathBuf, dry_run: bool) -> Self {
        Self { root, dry_run }
    }

    /// Destination path of `file`, always below the root.
    ///
    /// Absolute destinations are re-rooted under the destination directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination climbs above the root with `..`.
    pub fn target(&self, file: &FileRecord) -> Result<PathBuf> {
        let relative = file.relative();
        let mut target = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => target.push(part),
                Component::ParentDir => {
                    anyhow::bail!("destination escapes the output directory: {relative}")
                }
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            }
        }
        Ok(target)
    }

    /// Materialize one file record.
    ///
    /// Directories are created. Files with loaded contents are written from
    /// memory; untouched files are copied from their source.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created or a file cannot be
    /// written or copied.
    pub fn write(&self, file: &FileRecord) -> Result<PathBuf> {
        let target = self.target(file)?;
        if self.dry_run {
            return Ok(target);
        }
        if file.is_directory() {
            fs::create_dir_all(&target)
                .with_context(|| format!("creating directory {}", target.display()))?;
            return Ok(target);
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        file.contents().map_or_else(
            || copy(file.source(), &target),
            |contents| {
                fs::write(&target, contents)
                    .with_context(|| format!("writing {}", target.display()))
            },
        )?;
        Ok(target)
    }
}

fn copy(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .with_context(|| format!("copying {} to {}", source.display(), target.display()))?;
    Ok(())
}

/// Per-export tally of written and failed files.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    written: usize,
    failed: usize,
}

/// Run the `run` subcommand.
///
/// # Errors
///
/// Returns an error if initialization fails or any file could not be
/// written.
pub fn run(global: &GlobalOpts, opts: &RunOpts, log: &Arc<Logger>) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    let destination = Destination::new(opts.out.clone(), opts.dry_run);
    if opts.dry_run {
        log.info("dry run, no files will be written");
    }

    let mut tallies: HashMap<String, Tally> = HashMap::new();
    for pipeline in setup.context.stream() {
        let tally = tallies.entry(pipeline.export().to_string()).or_default();
        for file in pipeline {
            match destination.write(&file) {
                Ok(target) if opts.dry_run => {
                    tally.written += 1;
                    log.info(&format!("would write {}", target.display()));
                }
                Ok(target) => {
                    tally.written += 1;
                    log.debug(&format!("wrote {}", target.display()));
                }
                Err(e) => {
                    tally.failed += 1;
                    log.error(&format!("{e:#}"));
                }
            }
        }
    }

    for export in setup.context.exports() {
        let tally = tallies.get(export.name()).copied().unwrap_or_default();
        let status = match (tally.written, opts.dry_run) {
            (0, _) => ExportStatus::Empty,
            (_, true) => ExportStatus::DryRun,
            (_, false) => ExportStatus::Exported,
        };
        let message = match tally.failed {
            0 => format!("{} files", tally.written),
            failed => format!("{} files, {failed} failed", tally.written),
        };
        log.record_export(export.name(), status, Some(&message));
    }

    log.print_summary();

    let failed: usize = tallies.values().map(|t| t.failed).sum();
    if failed > 0 {
        anyhow::bail!("{failed} file(s) could not be written");
    }
    Ok(())
}
