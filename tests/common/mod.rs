// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed Node project and a fluent builder so
// each integration test can lay out a `package.json`, a `node_modules` tree
// and an exports document without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use npm_exports_cli::config::ExportOptions;
use npm_exports_cli::context::ExecutionContext;
use npm_exports_cli::logging::{LogLevel, Logger};
use serde_json::{Map, Value, json};

/// An isolated Node project backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct NodeProject {
    /// Temporary directory holding `package.json` and `node_modules/`.
    pub root: tempfile::TempDir,
    /// Logger shared by every context created from this project.
    pub log: Arc<Logger>,
}

impl NodeProject {
    /// Path to the project root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Path to the project's `package.json`.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.path().join("package.json")
    }

    /// Default run options for this project.
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            manifest_path: self.manifest_path(),
            log_level: LogLevel::Debug,
            ..ExportOptions::default()
        }
    }

    /// An execution context over the real filesystem.
    pub fn context(&self, options: ExportOptions) -> ExecutionContext {
        ExecutionContext::new(options, Arc::clone(&self.log))
    }

    /// Initialise a context with `options` and collect every produced
    /// destination path, in stream order.
    pub fn outputs_with(&self, options: ExportOptions) -> Vec<String> {
        let mut ctx = self.context(options);
        ctx.initialize().expect("initialize context");
        ctx.stream()
            .flat_map(|pipeline| pipeline.map(|f| f.display_path()).collect::<Vec<_>>())
            .collect()
    }

    /// [`outputs_with`](Self::outputs_with) using [`options`](Self::options).
    pub fn outputs(&self) -> Vec<String> {
        self.outputs_with(self.options())
    }
}

/// Fluent builder for [`NodeProject`].
pub struct NodeProjectBuilder {
    root: tempfile::TempDir,
    dependencies: Map<String, Value>,
    npm_exports: Option<Value>,
}

impl NodeProjectBuilder {
    /// Begin building an empty project.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
            dependencies: Map::new(),
            npm_exports: None,
        }
    }

    /// Declare a dependency and write `files` (relative path, contents)
    /// into `node_modules/<name>/`.
    pub fn with_package(mut self, name: &str, files: &[(&str, &str)]) -> Self {
        let dir = self.root.path().join("node_modules").join(name);
        std::fs::create_dir_all(&dir).expect("create package dir");
        for (relative, contents) in files {
            let path = dir.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create package subdir");
            }
            std::fs::write(&path, contents).expect("write package file");
        }
        self.dependencies
            .insert(name.to_string(), Value::String("1.0.0".to_string()));
        self
    }

    /// Write `node_modules/<name>/package.json` with a `files` list.
    pub fn with_main_files(self, name: &str, files: &[&str]) -> Self {
        let dir = self.root.path().join("node_modules").join(name);
        std::fs::create_dir_all(&dir).expect("create package dir");
        std::fs::write(dir.join("package.json"), json!({ "files": files }).to_string())
            .expect("write package manifest");
        self
    }

    /// Embed `exports` as the manifest's `npmExports` section.
    pub fn with_exports(mut self, exports: Value) -> Self {
        self.npm_exports = Some(exports);
        self
    }

    /// Write `exports` to `<root>/<filename>` instead of embedding it.
    pub fn with_exports_file(self, filename: &str, exports: &Value) -> Self {
        std::fs::write(self.root.path().join(filename), exports.to_string())
            .expect("write exports file");
        self
    }

    /// Write `package.json` and return the project.
    pub fn build(self) -> NodeProject {
        std::fs::create_dir_all(self.root.path().join("node_modules"))
            .expect("create node_modules");
        let mut manifest = Map::new();
        manifest.insert("name".to_string(), json!("fixture"));
        manifest.insert("dependencies".to_string(), Value::Object(self.dependencies));
        if let Some(exports) = self.npm_exports {
            manifest.insert("npmExports".to_string(), exports);
        }
        std::fs::write(
            self.root.path().join("package.json"),
            Value::Object(manifest).to_string(),
        )
        .expect("write package.json");
        NodeProject {
            root: self.root,
            log: Arc::new(Logger::new("test", LogLevel::Debug)),
        }
    }
}
