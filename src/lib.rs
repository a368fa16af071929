//! npm exports engine.
//!
//! Declarative tool that curates files out of installed `node_modules`
//! packages: each export directive selects packages from the manifest's
//! dependencies, enumerates their files through glob patterns, and pushes
//! every file through an ordered chain of filter, rename, replace-content
//! and move rules before it is written to a destination tree.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: read the manifest and the exports document
//! - **[`rules`]**: the rule model, the global registry and one pipeline stage per rule kind
//! - **[`export`]** / **[`pipeline`]**: resolve export directives and run their pipelines
//! - **[`context`]** / **[`commands`]**: orchestrate one invocation (`run`, `check`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod file;
pub mod glob;
pub mod logging;
pub mod operations;
pub mod paths;
pub mod pattern;
pub mod pipeline;
pub mod rules;
