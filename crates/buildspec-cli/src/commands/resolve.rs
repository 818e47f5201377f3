//! Recipe resolution commands.

use anyhow::{Context, Result};
use tracing::info;

use super::{load_model, print_json};

/// Squash a recipe and print the flat configuration.
pub fn resolve(path: &str, version: &str, toolchain: &str, toolchain_version: &str) -> Result<()> {
    let model = load_model(path)?;
    info!(path, version, toolchain, toolchain_version, "Resolving recipe");

    let config = model
        .squash(toolchain, toolchain_version, version)
        .with_context(|| {
            format!(
                "Failed to resolve {} for version {} with {} {}",
                path, version, toolchain, toolchain_version
            )
        })?;

    print_json(&config)
}

/// Validate a (partial) request and print the recipe defaults.
pub fn specs(
    path: &str,
    version: Option<&str>,
    toolchain: Option<&str>,
    toolchain_version: Option<&str>,
) -> Result<()> {
    let model = load_model(path)?;

    let specs = model
        .get_specs_for(version, toolchain, toolchain_version)
        .with_context(|| format!("Request not supported by {}", path))?;

    print_json(&specs)
}
