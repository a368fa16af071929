//! Top-level subcommand orchestration (`run`, `check`, `version`).

pub mod check;
pub mod run;
pub mod version;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::ExportOptions;
use crate::context::ExecutionContext;
use crate::logging::Logger;

/// Shared state produced by the common command setup sequence.
///
/// Loads the manifest, analyses rules and exports, and resolves every
/// export's sources so that each command starts from a context ready to
/// stream pipelines.
#[derive(Debug)]
pub struct CommandSetup {
    /// Context positioned at the start of pipeline streaming.
    pub context: ExecutionContext,
}

impl CommandSetup {
    /// Build the run options from the global flags and initialise the
    /// execution context.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read, `node_modules` is
    /// missing, the exports document is invalid, or no export survives
    /// resolution.
    pub fn init(global: &GlobalOpts, log: &Arc<Logger>) -> Result<Self> {
        let options = ExportOptions {
            manifest_path: global.manifest.clone(),
            exports_json_file_path: global.exports_file.clone(),
            log_level: log.min_level(),
            parallel: global.parallel,
        };
        log.debug(&format!("manifest: {}", options.manifest_path.display()));
        if let Some(path) = &options.exports_json_file_path {
            log.debug(&format!("exports file: {}", path.display()));
        }

        let mut context = ExecutionContext::new(options, Arc::clone(log));
        context
            .initialize()
            .with_context(|| format!("cannot initialize exports from {}", global.manifest.display()))?;

        log.debug(&format!("{} dependencies", context.module_names().len()));
        log.debug(&format!("{} global rules", context.registry().len()));
        log.info(&format!("resolved {} exports", context.exports().len()));
        Ok(Self { context })
    }
}
