//! Config Command
//!
//! Manage repograde configuration.
//!
//! Usage:
//!   repograde config show [-f json]
//!   repograde config path
//!   repograde config init [-g] [--force]

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::{GraderError, Result};

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    match format {
        "json" => ConfigLoader::show_config(true),
        "text" | "toml" => ConfigLoader::show_config(false),
        other => Err(GraderError::Config(format!(
            "Invalid format '{}'. Valid values: text, json",
            other
        ))),
    }
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a commented default config file
pub fn init(global: bool, force: bool) -> Result<()> {
    let output = Output::new();

    let (scope, config_path) = if global {
        ("global", ConfigLoader::init_global(force)?)
    } else {
        ("project", ConfigLoader::init_project(force)?)
    };

    output.success(&format!("Initialized {} configuration", scope));
    println!("  Config: {}", config_path.display());
    if !force {
        output.info("Existing files are left untouched; pass --force to overwrite");
    }
    Ok(())
}
