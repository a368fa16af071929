#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for export resolution and pipeline output over a real
//! `node_modules` tree.

mod common;

use common::NodeProjectBuilder;
use npm_exports_cli::config::ExportOptions;
use npm_exports_cli::context::Phase;
use npm_exports_cli::error::{ConfigError, ExportsError};
use serde_json::json;

// ---------------------------------------------------------------------------
// Sources and moves
// ---------------------------------------------------------------------------

#[test]
fn main_files_are_moved_under_the_package_directory() {
    let project = NodeProjectBuilder::new()
        .with_package("lodash", &[("index.js", "1"), ("lib/a.js", "2"), ("README.md", "3")])
        .with_main_files("lodash", &["index.js", "lib/"])
        .with_exports(json!({
            "rules": [{"id": "vendor", "type": "move", "to": "vendor/#package#"}],
            "exports": [{"from": "lodash", "select": "#main#", "move": "#vendor"}]
        }))
        .build();

    assert_eq!(
        project.outputs(),
        ["vendor/lodash/index.js", "vendor/lodash/lib/"]
    );
}

#[test]
fn negated_patterns_exclude_matches() {
    let project = NodeProjectBuilder::new()
        .with_package(
            "pkg",
            &[("a.js", ""), ("b.js", ""), ("test/c.js", "")],
        )
        .with_exports(json!({
            "rules": [{"id": "scripts", "type": "filter", "extnameLike": ".js"}],
            "exports": {"from": "pkg", "select": "**/*.js,!test"}
        }))
        .build();

    assert_eq!(project.outputs(), ["a.js", "b.js"]);
}

#[test]
fn minimized_move_strips_the_shared_prefix() {
    let project = NodeProjectBuilder::new()
        .with_package(
            "ui",
            &[
                ("dist/css/a.css", ""),
                ("dist/css/themes/b.css", ""),
                ("dist/js/c.js", ""),
            ],
        )
        .with_exports(json!({
            "rules": [{"id": "www", "type": "move", "to": "wwwroot/#package#"}],
            "exports": [{
                "from": "ui",
                "select": "dist/**/*.css",
                "move": "#www",
                "withHierarchy": "minimized"
            }]
        }))
        .build();

    assert_eq!(
        project.outputs(),
        ["wwwroot/ui/a.css", "wwwroot/ui/themes/b.css"]
    );
}

#[test]
fn flattened_move_drops_directories() {
    let project = NodeProjectBuilder::new()
        .with_package(
            "ui",
            &[
                ("dist/css/a.css", ""),
                ("dist/css/themes/b.css", ""),
                ("dist/js/c.js", ""),
            ],
        )
        .with_exports(json!({
            "rules": [{"id": "styles", "type": "filter", "extnameLike": ".css"}],
            "defaultExportRules": {"move": "out", "hierarchyAdjustment": "Flattened"},
            "exports": [{"from": "ui", "select": "dist/**/*"}]
        }))
        .build();

    assert_eq!(project.outputs(), ["out/a.css", "out/b.css", "out/c.js"]);
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[test]
fn predicates_of_one_filter_must_all_match() {
    let project = NodeProjectBuilder::new()
        .with_package(
            "pkg",
            &[("a.js", ""), ("a.ts", ""), ("test/c.js", ""), ("test/d.ts", "")],
        )
        .with_exports(json!({
            "rules": [{"id": "test-js", "type": "filter", "extnameLike": ".js", "dirnameLike": "test"}],
            "exports": [{"from": "pkg", "select": "**/*", "filter": "#test-js"}]
        }))
        .build();

    assert_eq!(project.outputs(), ["test/c.js"]);
}

#[test]
fn every_filter_of_an_export_must_match() {
    let project = NodeProjectBuilder::new()
        .with_package(
            "pkg",
            &[("a.js", ""), ("a.ts", ""), ("test/c.js", ""), ("test/d.ts", "")],
        )
        .with_exports(json!({
            "rules": [
                {"id": "scripts", "type": "filter", "extnameLike": ".js"},
                {"id": "tests", "type": "filter", "dirnameLike": "test"}
            ],
            "exports": [{"from": "pkg", "select": "**/*", "filter": "#scripts, #tests"}]
        }))
        .build();

    assert_eq!(project.outputs(), ["test/c.js"]);
}

// ---------------------------------------------------------------------------
// Export isolation and ordering
// ---------------------------------------------------------------------------

#[test]
fn shared_source_rule_resolves_per_export_and_package() {
    let project = NodeProjectBuilder::new()
        .with_package("alpha", &[("alpha.js", ""), ("beta.js", "")])
        .with_package("beta", &[("alpha.js", ""), ("beta.js", "")])
        .with_exports(json!({
            "rules": [{"id": "own", "type": "source", "src": "#package#.js"}],
            "exports": [
                {"name": "A", "from": "alpha", "select": "#own"},
                {"name": "B", "from": "beta", "select": "#own"}
            ]
        }))
        .build();

    assert_eq!(project.outputs(), ["alpha.js", "beta.js"]);
}

#[test]
fn sequential_and_parallel_resolution_agree() {
    let project = NodeProjectBuilder::new()
        .with_package("alpha", &[("index.js", ""), ("lib/x.js", "")])
        .with_package("beta", &[("index.js", "")])
        .with_main_files("alpha", &["index.js", "lib/x.js"])
        .with_exports(json!({
            "rules": [{"id": "to", "type": "move", "to": "v/#package#"}],
            "defaultExportRules": {"move": "#to"},
            "exports": [
                {"name": "Main", "from": "/^a/", "select": "#main#"},
                {"name": "Missing", "from": "beta", "select": "#main#"},
                {"name": "All", "from": "alpha,beta", "select": "index.js"}
            ]
        }))
        .build();

    let parallel = project.outputs();
    let sequential = project.outputs_with(ExportOptions {
        parallel: false,
        ..project.options()
    });
    assert_eq!(parallel, sequential);
    assert_eq!(
        parallel,
        ["v/alpha/index.js", "v/alpha/lib/x.js", "v/alpha/index.js", "v/beta/index.js"]
    );
}

// ---------------------------------------------------------------------------
// Configuration sources and failures
// ---------------------------------------------------------------------------

#[test]
fn external_exports_file_replaces_the_embedded_section() {
    let exports = json!({
        "rules": [{"id": "scripts", "type": "filter", "extnameLike": ".js"}],
        "exports": [{"from": "pkg", "select": "b.js"}]
    });
    let project = NodeProjectBuilder::new()
        .with_package("pkg", &[("a.js", ""), ("b.js", "")])
        .with_exports(json!({
            "rules": [{"id": "scripts", "type": "filter", "extnameLike": ".js"}],
            "exports": [{"from": "pkg", "select": "a.js"}]
        }))
        .with_exports_file("exports.json", &exports)
        .build();

    let options = ExportOptions {
        exports_json_file_path: Some(project.root_path().join("exports.json")),
        ..project.options()
    };
    assert_eq!(project.outputs_with(options), ["b.js"]);
}

#[test]
fn duplicate_rule_ids_fail_initialization() {
    let project = NodeProjectBuilder::new()
        .with_package("pkg", &[("a.js", "")])
        .with_exports(json!({
            "rules": [
                {"id": "x", "type": "filter", "extnameLike": ".js"},
                {"id": "x", "type": "filter", "extnameLike": ".ts"}
            ],
            "exports": [{"from": "pkg", "select": "a.js"}]
        }))
        .build();

    let mut ctx = project.context(project.options());
    let err = ctx.initialize().unwrap_err();
    assert!(matches!(
        err,
        ExportsError::Config(ConfigError::DuplicateRuleIds(ref ids)) if ids.len() == 1
    ));
    assert_eq!(ctx.phase(), Phase::Failed);
    assert_eq!(ctx.stream().count(), 0);
}

#[test]
fn rule_less_document_fails_initialization() {
    let project = NodeProjectBuilder::new()
        .with_package("pkg", &[("a.js", "")])
        .with_exports(json!({
            "rules": [{"id": "empty", "type": "filter"}],
            "exports": [{"from": "pkg", "select": "a.js"}]
        }))
        .build();

    let mut ctx = project.context(project.options());
    assert!(matches!(
        ctx.initialize(),
        Err(ExportsError::Config(ConfigError::NoValidRules))
    ));
    assert_eq!(ctx.phase(), Phase::Failed);

    let project = NodeProjectBuilder::new()
        .with_package("pkg", &[("a.js", "")])
        .with_exports(json!({"exports": [{"from": "pkg", "select": "a.js"}]}))
        .build();
    let mut ctx = project.context(project.options());
    assert!(matches!(
        ctx.initialize(),
        Err(ExportsError::Config(ConfigError::NoValidRules))
    ));
}

#[test]
fn missing_node_modules_fails_initialization() {
    let project = NodeProjectBuilder::new()
        .with_package("pkg", &[("a.js", "")])
        .with_exports(json!({"exports": [{"from": "pkg", "select": "a.js"}]}))
        .build();
    std::fs::remove_dir_all(project.root_path().join("node_modules")).unwrap();

    let mut ctx = project.context(project.options());
    assert!(matches!(
        ctx.initialize(),
        Err(ExportsError::Config(ConfigError::ModulesDirectoryMissing(_)))
    ));
}

#[test]
fn excluded_exports_are_recorded_for_the_summary() {
    let project = NodeProjectBuilder::new()
        .with_package("pkg", &[("a.js", "")])
        .with_exports(json!({
            "rules": [{"id": "scripts", "type": "filter", "extnameLike": ".js"}],
            "exports": [
                {"name": "Broken", "from": "pkg", "select": "#nope"},
                {"name": "Fine", "from": "pkg", "select": "a.js"}
            ]
        }))
        .build();

    assert_eq!(project.outputs(), ["a.js"]);
    let excluded: Vec<_> = project
        .log
        .export_entries()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(excluded, ["Broken"]);
    assert_eq!(project.log.excluded_count(), 1);
}
