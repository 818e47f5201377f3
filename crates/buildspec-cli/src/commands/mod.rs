//! CLI command implementations.

pub mod resolve;

use anyhow::{Context, Result};
use buildspec_config::format::FORMAT_DEFAULT_VERSION;
use buildspec_config::{RecipeModel, RecipeSummary};

pub(crate) fn read_recipe(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read recipe file: {}", path))
}

pub(crate) fn load_model(path: &str) -> Result<RecipeModel> {
    RecipeModel::from_path(path).with_context(|| format!("Failed to load recipe: {}", path))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

pub fn validate(path: &str) -> Result<()> {
    let content = read_recipe(path)?;
    match RecipeModel::from_kdl(&content) {
        Ok(model) => {
            println!("Recipe is valid");
            print_json(&RecipeSummary::from(&model))
        }
        Err(e) => {
            println!("Recipe error: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn format_version(path: &str, allow_missing: bool) -> Result<()> {
    let content = read_recipe(path)?;
    let version = match buildspec_config::format_version(&content) {
        Some(version) => version,
        None if allow_missing => {
            tracing::warn!(path, default = %FORMAT_DEFAULT_VERSION, "No format version header, assuming default");
            FORMAT_DEFAULT_VERSION
        }
        None => anyhow::bail!("No format version header found in {}", path),
    };
    if !version.is_supported() {
        tracing::warn!(path, version = %version, "Format version has no parser");
    }
    println!("{}", version);
    Ok(())
}
