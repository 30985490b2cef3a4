//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/repograde/config.toml)
//! 3. Project config (.repograde/config.toml)
//! 4. Environment variables (REPOGRADE_* prefix, `__` between sections)
//! 5. Azure OpenAI variables (AZURE_OPENAI_*)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::constants::llm::env as azure_env;
use crate::types::{GraderError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .map_err(|e| GraderError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(GraderError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Self::env_providers())
            .extract()
            .map_err(|e| GraderError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        figment.merge(Self::env_providers())
    }

    /// REPOGRADE_LLM__TIMEOUT_SECS -> llm.timeout_secs, then the Azure names
    fn env_providers() -> Figment {
        Figment::new()
            .merge(Env::prefixed("REPOGRADE_").split("__"))
            .merge(Env::raw().filter_map(|key| azure_key_path(key.as_str()).map(Into::into)))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/repograde/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("repograde"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".repograde")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| GraderError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            GraderError::Config("Cannot determine global config directory".to_string())
        })?;

        Self::write_config(&global_dir, force)
    }

    /// Initialize project configuration
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_config(&Self::project_dir(), force)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn write_config(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Generate default config content (TOML)
    fn default_config() -> String {
        r#"# repograde configuration
# Project settings in .repograde/config.toml override ~/.config/repograde/config.toml.
# Credentials belong in the environment (AZURE_OPENAI_API_KEY), not in this file.

[llm]
provider = "azure-openai"
# Deployment name for Azure, model name for OpenAI
# model = "gpt-4o"
# endpoint = "https://<resource>.openai.azure.com"
api_version = "2024-10-21"
timeout_secs = 300
temperature = 0.0

[fetch]
git_binary = "git"
clone_depth = 1
clone_timeout_secs = 300
accepted_hosts = ["github.com", "github.io"]

[grading]
max_files_per_batch = 5
batch_concurrency = 1

[server]
bind = "0.0.0.0:8000"
"#
        .to_string()
    }
}

/// Map an Azure OpenAI environment variable onto its config key path
fn azure_key_path(name: &str) -> Option<&'static str> {
    if name.eq_ignore_ascii_case(azure_env::API_KEY) {
        Some("llm.api_key")
    } else if name.eq_ignore_ascii_case(azure_env::ENDPOINT) {
        Some("llm.endpoint")
    } else if name.eq_ignore_ascii_case(azure_env::DEPLOYMENT) {
        Some("llm.model")
    } else if name.eq_ignore_ascii_case(azure_env::API_VERSION) {
        Some("llm.api_version")
    } else {
        None
    }
}
