//! Command: print version information.

use std::io::Write as _;

use anyhow::Result;

/// Version string baked in by the build script, or the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("NPM_EXPORTS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the npm-exports version to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run() -> Result<()> {
    writeln!(std::io::stdout().lock(), "npm-exports {}", version())?;
    Ok(())
}
