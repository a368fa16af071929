//! Execution orchestration: load the manifest, analyse rules and exports,
//! resolve sources, then stream one pipeline per (export, package) pair.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;
use serde_json::Value;

use crate::config::exports::ExportsConfig;
use crate::config::{ExportOptions, manifest, text};
use crate::error::{ConfigError, ExportsError, ResolveError};
use crate::export::Export;
use crate::glob::{FsGlobEnumerator, GlobEnumerator};
use crate::logging::{BufferedLog, ExportStatus, Log, Logger};
use crate::operations::{FileSystemOps, SystemFileSystemOps};
use crate::pipeline::Pipeline;
use crate::rules::{HierarchyAdjustment, RuleIds, RuleRegistry};

/// Per-pipeline values shared by every stage of one (export, package) pair.
pub struct TransformContext {
    /// Export name.
    pub export: String,
    /// Package the pipeline reads from.
    pub package: String,
    /// Package name substituted into move destinations instead of `package`.
    pub overriding_move_package: Option<String>,
    /// Export-level hierarchy mode; overrides the move rule's own.
    pub hierarchy: Option<HierarchyAdjustment>,
    /// Filesystem used for content reads.
    pub fs: Arc<dyn FileSystemOps>,
    /// Pipeline logger.
    pub log: Arc<dyn Log>,
}

impl fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field("export", &self.export)
            .field("package", &self.package)
            .field("overriding_move_package", &self.overriding_move_package)
            .field("hierarchy", &self.hierarchy)
            .field("fs", &"<dyn FileSystemOps>")
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl TransformContext {
    /// Context for `package` in `export`, with no overrides.
    #[must_use]
    pub fn new(export: &str, package: &str, fs: Arc<dyn FileSystemOps>, log: Arc<dyn Log>) -> Self {
        Self {
            export: export.to_string(),
            package: package.to_string(),
            overriding_move_package: None,
            hierarchy: None,
            fs,
            log,
        }
    }

    /// Package name for `#package#` in move destinations.
    #[must_use]
    pub fn move_package(&self) -> &str {
        self.overriding_move_package
            .as_deref()
            .unwrap_or(&self.package)
    }

    /// `<export> - <package>`, as used in log messages.
    #[must_use]
    pub fn pipeline_name(&self) -> String {
        format!("{} - {}", self.export, self.package)
    }
}

/// Initialization progress. Steps run strictly in order; any failure moves
/// to [`Phase::Failed`] and stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started.
    Created,
    /// Reading the dependency manifest.
    LoadManifest,
    /// Locating `node_modules` next to the manifest.
    ResolveModulesDir,
    /// Reading the exports document and building the rule registry.
    AnalyzeRules,
    /// Building export directives.
    AnalyzeExports,
    /// Resolving deferred sources and rule references.
    ResolveExports,
    /// Handing out pipelines.
    Streaming,
    /// Every pipeline has been handed out.
    Done,
    /// Initialization failed.
    Failed,
}

/// Drives one invocation from manifest to pipelines.
pub struct ExecutionContext {
    options: ExportOptions,
    fs: Arc<dyn FileSystemOps>,
    glob: Arc<dyn GlobEnumerator>,
    log: Arc<Logger>,
    phase: Phase,
    modules_dir: PathBuf,
    module_names: Vec<String>,
    registry: RuleRegistry,
    ids: RuleIds,
    exports: Vec<Export>,
    main_files: Mutex<HashMap<String, Option<Vec<String>>>>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("options", &self.options)
            .field("fs", &"<dyn FileSystemOps>")
            .field("glob", &"<dyn GlobEnumerator>")
            .field("phase", &self.phase)
            .field("modules_dir", &self.modules_dir)
            .field("module_names", &self.module_names)
            .field("rules", &self.registry.len())
            .field("exports", &self.exports.len())
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    /// Context over the real filesystem.
    #[must_use]
    pub fn new(options: ExportOptions, log: Arc<Logger>) -> Self {
        Self {
            options,
            fs: Arc::new(SystemFileSystemOps),
            glob: Arc::new(FsGlobEnumerator),
            log,
            phase: Phase::Created,
            modules_dir: PathBuf::new(),
            module_names: Vec::new(),
            registry: RuleRegistry::default(),
            ids: RuleIds::new(),
            exports: Vec::new(),
            main_files: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the filesystem collaborator.
    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn FileSystemOps>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the glob collaborator.
    #[must_use]
    pub fn with_glob(mut self, glob: Arc<dyn GlobEnumerator>) -> Self {
        self.glob = glob;
        self
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Resolved `node_modules` directory.
    #[must_use]
    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Dependency names from the manifest, in declaration order.
    #[must_use]
    pub fn module_names(&self) -> &[String] {
        &self.module_names
    }

    /// Global rules.
    #[must_use]
    pub const fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Exports that survived analysis and resolution, in declaration order.
    #[must_use]
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Filesystem collaborator.
    #[must_use]
    pub fn fs(&self) -> &dyn FileSystemOps {
        self.fs.as_ref()
    }

    /// Run every initialization step up to [`Phase::Streaming`].
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; the phase becomes
    /// [`Phase::Failed`].
    pub fn initialize(&mut self) -> Result<(), ExportsError> {
        let result = self.run_steps();
        if let Err(e) = &result {
            self.phase = Phase::Failed;
            self.log.error(&format!(
                "Initialization failed (src: '{}', reason: '{e}')",
                self.options.manifest_path.display()
            ));
        }
        result
    }

    fn run_steps(&mut self) -> Result<(), ExportsError> {
        self.phase = Phase::LoadManifest;
        self.log.stage("Reading package.json contents...");
        let manifest_path = self.options.manifest_path.clone();
        let manifest = manifest::load(self.fs.as_ref(), &manifest_path)?;

        self.phase = Phase::ResolveModulesDir;
        let modules_dir = manifest_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("node_modules");
        if !self.fs.is_dir(&modules_dir) {
            return Err(ConfigError::ModulesDirectoryMissing(modules_dir.display().to_string()).into());
        }
        let modules_dir = self.fs.canonicalize(&modules_dir).map_err(|source| ConfigError::Io {
            path: modules_dir.display().to_string(),
            source,
        })?;
        self.log.info(&format!(
            "Resolved node_modules directory - {}",
            modules_dir.display()
        ));
        self.modules_dir = modules_dir;

        self.phase = Phase::AnalyzeRules;
        self.log.info("Analyzing package.json contents...");
        self.module_names = manifest.dependency_names();
        if self.module_names.is_empty() {
            self.log.warn(&format!(
                "No packages found in the package.json (path: '{}')",
                manifest_path.display()
            ));
            return Err(ConfigError::NoDependencies(manifest_path.display().to_string()).into());
        }
        let config = self.read_exports_config(&manifest_path, manifest.npm_exports)?;
        self.log.info("Analyzing global rules...");
        self.registry = RuleRegistry::build(&config.rules, self.log.as_ref())?;

        self.phase = Phase::AnalyzeExports;
        self.log.info("Analyzing export directives...");
        self.exports = self.analyze_exports(&config);
        if self.exports.is_empty() {
            return Err(ConfigError::NoValidExports.into());
        }

        self.phase = Phase::ResolveExports;
        self.log.info("Resolving export directive sources...");
        self.resolve_exports();
        if self.exports.is_empty() {
            return Err(ConfigError::NoValidExports.into());
        }

        self.phase = Phase::Streaming;
        self.log.stage("Beginning transformations...");
        Ok(())
    }

    fn read_exports_config(
        &self,
        manifest_path: &Path,
        embedded: Option<Value>,
    ) -> Result<ExportsConfig, ConfigError> {
        if let Some(path) = &self.options.exports_json_file_path {
            self.log.info(&format!(
                "Reading npm exports contents from {}...",
                path.display()
            ));
            return manifest::read_json(self.fs.as_ref(), path);
        }
        let embedded = embedded
            .filter(|v| !v.is_null())
            .ok_or(ConfigError::ExportsSectionMissing)?;
        self.log.info("Reading embedded npm exports contents...");
        serde_json::from_value(embedded).map_err(|source| ConfigError::InvalidJson {
            path: manifest_path.display().to_string(),
            source,
        })
    }

    fn analyze_exports(&self, config: &ExportsConfig) -> Vec<Export> {
        let mut exports = Vec::new();
        let directives = config.exports.iter().filter(|x| !x.is_null());
        for (index, data) in directives.enumerate() {
            let name = text(data.get("name")).unwrap_or_else(|| format!("Export - {}", index + 1));
            match Export::create(
                data,
                &name,
                config,
                &self.module_names,
                &self.registry,
                &self.ids,
                self.log.as_ref(),
            ) {
                Ok(export) => exports.push(export),
                Err(e) => self.exclude(&name, &e.to_string()),
            }
        }
        exports
    }

    fn resolve_exports(&mut self) {
        let mut exports = std::mem::take(&mut self.exports);
        let this = &*self;
        let lookup = |package: &str| this.main_files(package);
        let resolve_one = |export: &mut Export| {
            let log = BufferedLog::new(Arc::clone(&this.log));
            let result = export.resolve(&this.registry, &this.ids, &lookup, &log);
            if let Err(e) = &result {
                log.error(&e.to_string());
            }
            (log, result)
        };
        let outcomes: Vec<(BufferedLog, Result<(), ResolveError>)> = if this.options.parallel {
            exports.par_iter_mut().map(resolve_one).collect()
        } else {
            exports.iter_mut().map(resolve_one).collect()
        };

        let mut resolved = Vec::with_capacity(exports.len());
        for (export, (log, result)) in exports.into_iter().zip(outcomes) {
            log.flush();
            match result {
                Ok(()) => resolved.push(export),
                Err(e) => this.exclude(export.name(), &e.to_string()),
            }
        }
        self.exports = resolved;
    }

    fn exclude(&self, name: &str, reason: &str) {
        self.log
            .warn(&format!("Export directive excluded (export: '{name}', reason: '{reason}')"));
        self.log
            .record_export(name, ExportStatus::Excluded, Some(reason));
    }

    /// Published file list of `package`, read from its manifest once.
    fn main_files(&self, package: &str) -> Option<Vec<String>> {
        let mut cache = self
            .main_files
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(files) = cache.get(package) {
            return files.clone();
        }
        let path = self.modules_dir.join(package).join("package.json");
        let files = manifest::load(self.fs.as_ref(), &path)
            .ok()
            .map(|m| m.main_files())
            .filter(|files| !files.is_empty());
        cache.insert(package.to_string(), files.clone());
        files
    }

    /// Pipelines for every (export, package) pair, in export declaration
    /// order and then package match order.
    ///
    /// Empty unless [`initialize`](Self::initialize) succeeded. Exhausting
    /// the stream moves the phase to [`Phase::Done`].
    pub fn stream(&mut self) -> ExportStream<'_> {
        let queue = if self.phase == Phase::Streaming {
            self.exports
                .iter()
                .enumerate()
                .flat_map(|(index, export)| {
                    export
                        .packages()
                        .iter()
                        .enumerate()
                        .map(move |(n, package)| (index, package.clone(), n == 0))
                })
                .collect()
        } else {
            VecDeque::new()
        };
        ExportStream {
            context: self,
            queue,
        }
    }
}

/// Lazy sequence of pipelines; see [`ExecutionContext::stream`].
#[derive(Debug)]
pub struct ExportStream<'a> {
    context: &'a mut ExecutionContext,
    queue: VecDeque<(usize, String, bool)>,
}

impl ExportStream<'_> {
    /// Pairs not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl Iterator for ExportStream<'_> {
    type Item = Pipeline;

    fn next(&mut self) -> Option<Pipeline> {
        let ctx = &mut *self.context;
        while let Some((index, package, first)) = self.queue.pop_front() {
            let Some(export) = ctx.exports.get(index) else {
                continue;
            };
            let log = Arc::clone(&ctx.log) as Arc<dyn Log>;
            match export.create_pipeline(
                &package,
                &ctx.modules_dir,
                ctx.glob.as_ref(),
                Arc::clone(&ctx.fs),
                log,
            ) {
                Ok(pipeline) => {
                    if first {
                        ctx.log
                            .stage(&format!("Processing {}", export.log_context(None)));
                    }
                    ctx.log
                        .debug(&format!("Processing {}", export.log_context(Some(&package))));
                    return Some(pipeline);
                }
                Err(e) => ctx.log.error(&e.to_string()),
            }
        }
        if ctx.phase == Phase::Streaming {
            ctx.log.success("Finished processing all exports");
            ctx.phase = Phase::Done;
        }
        None
    }
}
