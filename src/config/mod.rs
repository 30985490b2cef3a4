//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/repograde/config.toml)
//! 3. Project config (.repograde/config.toml)
//! 4. Environment variables (REPOGRADE_*, then AZURE_OPENAI_*)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
