#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `check` command's plan rendering.

mod common;

use common::NodeProjectBuilder;
use npm_exports_cli::commands::check::render_plan;
use npm_exports_cli::config::ExportOptions;
use serde_json::json;

/// Snapshot of the plan for two exports sharing global rules.
///
/// Resolution runs sequentially so that generated rule ids are stable.
#[test]
fn check_plan() {
    let project = NodeProjectBuilder::new()
        .with_package("lodash", &[("index.js", ""), ("lib/a.js", "")])
        .with_package("left-pad", &[("index.js", "")])
        .with_main_files("lodash", &["index.js", "lib/"])
        .with_main_files("left-pad", &["index.js"])
        .with_exports(json!({
            "rules": [
                {"id": "js", "type": "filter", "extnameLike": ".js"},
                {"id": "vendor", "type": "move", "to": "vendor/#package#"},
                {"id": "banner", "type": "replaceContent", "if": "#js", "replace": "/^/", "with": "/* #package# */"}
            ],
            "exports": [
                {
                    "name": "Scripts",
                    "from": "lodash,left-pad",
                    "select": "#main#,!**/*.md",
                    "filter": "#js",
                    "replaceContent": "#banner",
                    "move": "#vendor",
                    "withHierarchy": "flattened"
                },
                {
                    "name": "Pad",
                    "from": "left-pad",
                    "select": "*.js",
                    "rename": "pad.js",
                    "overridingMovePackageName": "_",
                    "move": "#vendor"
                }
            ]
        }))
        .build();

    let mut ctx = project.context(ExportOptions {
        parallel: false,
        ..project.options()
    });
    ctx.initialize().unwrap();

    insta::assert_snapshot!(render_plan(&ctx), @r"
    2 exports over 2 dependencies

    export 'Scripts'
      packages: lodash, left-pad
      source: source-3 [#main#, !**/*.md]
        lodash: index.js, lib/, !**/*.md
        left-pad: index.js, !**/*.md
      stages:
        1. Filter js: extnameLike '.js'
        2. ReplaceContent banner: replace '/^/' with '/* #package# */' if '#js'
        3. Move vendor: to 'vendor/#package#' (Flattened)

    export 'Pad'
      packages: left-pad
      move package: _
      source: source-4 [*.js]
        left-pad: *.js
      stages:
        1. Rename rename-5: in FileName replace everything with 'pad.js'
        2. Move vendor: to 'vendor/#package#' (None)
    ");
}

#[test]
fn plan_lists_only_surviving_exports() {
    let project = NodeProjectBuilder::new()
        .with_package("pkg", &[("a.js", "")])
        .with_exports(json!({
            "rules": [{"id": "scripts", "type": "filter", "extnameLike": ".js"}],
            "exports": [
                {"name": "Broken", "from": "pkg", "select": "#missing"},
                {"name": "Kept", "from": "pkg", "select": "a.js"}
            ]
        }))
        .build();

    let mut ctx = project.context(project.options());
    ctx.initialize().unwrap();
    let plan = render_plan(&ctx);
    assert!(plan.starts_with("1 exports over 1 dependencies"));
    assert!(plan.contains("export 'Kept'"));
    assert!(!plan.contains("Broken"));
    assert!(plan.contains("stages: (none)"));
}
