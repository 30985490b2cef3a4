//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/repograde/) and project (.repograde/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{fetch, grading, llm, network};
use crate::types::{GraderError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider settings
    pub llm: LlmConfig,

    /// Repository acquisition settings
    pub fetch: FetchConfig,

    /// Batch grading settings
    pub grading: GradingConfig,

    /// HTTP service settings
    pub server: ServerConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `GraderError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(GraderError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(GraderError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.fetch.clone_timeout_secs == 0 {
            return Err(GraderError::Config(
                "fetch clone_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.fetch.clone_depth == 0 {
            return Err(GraderError::Config(
                "fetch clone_depth must be greater than 0".to_string(),
            ));
        }

        if self.fetch.accepted_hosts.is_empty() {
            return Err(GraderError::Config(
                "fetch accepted_hosts must list at least one host".to_string(),
            ));
        }

        if !(1..=grading::MAX_FILES_PER_BATCH).contains(&self.grading.max_files_per_batch) {
            return Err(GraderError::Config(format!(
                "grading max_files_per_batch must be between 1 and {}, got {}",
                grading::MAX_FILES_PER_BATCH,
                self.grading.max_files_per_batch
            )));
        }

        if self.grading.batch_concurrency == 0 {
            return Err(GraderError::Config(
                "grading batch_concurrency must be greater than 0".to_string(),
            ));
        }

        if let Some(template) = &self.grading.prompt_template {
            crate::ai::prompt::PromptTemplate::new(template.clone())?;
        }

        Ok(())
    }

    /// Ensure the selected provider has everything it needs to make calls.
    ///
    /// Reports every missing value at once, named by the environment
    /// variable that supplies it.
    pub fn require_credentials(&self) -> Result<()> {
        let mut missing = Vec::new();
        let is_blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());

        match self.llm.provider.as_str() {
            "azure-openai" => {
                if is_blank(&self.llm.api_key) {
                    missing.push(llm::env::API_KEY.to_string());
                }
                if is_blank(&self.llm.endpoint) {
                    missing.push(llm::env::ENDPOINT.to_string());
                }
                if self.llm.model.trim().is_empty() {
                    missing.push(llm::env::DEPLOYMENT.to_string());
                }
            }
            "openai" => {
                if is_blank(&self.llm.api_key) && is_blank(&std::env::var("OPENAI_API_KEY").ok()) {
                    missing.push("OPENAI_API_KEY".to_string());
                }
            }
            other => {
                return Err(GraderError::Config(format!(
                    "Unknown provider: {}. Supported: azure-openai, openai",
                    other
                )));
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GraderError::MissingEnvironment(missing))
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "azure-openai" or "openai"
    pub provider: String,

    /// Model name (the deployment name for Azure)
    pub model: String,

    /// Resource endpoint (Azure) or API base (OpenAI-compatible)
    pub endpoint: Option<String>,

    /// Azure REST API version
    pub api_version: String,

    /// API key, never serialized to output
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum completion tokens
    pub max_tokens: u32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: llm::DEFAULT_PROVIDER.to_string(),
            model: String::new(),
            endpoint: None,
            api_version: llm::DEFAULT_AZURE_API_VERSION.to_string(),
            api_key: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: llm::DEFAULT_TEMPERATURE,
            max_tokens: llm::DEFAULT_MAX_TOKENS,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Fetch Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Clone binary
    pub git_binary: String,

    /// `--depth` passed to the clone
    pub clone_depth: u32,

    /// Clone timeout in seconds
    pub clone_timeout_secs: u64,

    /// A repository reference must contain one of these markers
    pub accepted_hosts: Vec<String>,

    /// Parent directory for workspaces (system temp dir when unset)
    pub workspace_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            git_binary: fetch::DEFAULT_GIT_BINARY.to_string(),
            clone_depth: fetch::DEFAULT_CLONE_DEPTH,
            clone_timeout_secs: fetch::DEFAULT_CLONE_TIMEOUT_SECS,
            accepted_hosts: fetch::DEFAULT_ACCEPTED_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            workspace_dir: None,
        }
    }
}

impl FetchConfig {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }
}

// =============================================================================
// Grading Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Files kept per batch; extra names are dropped with a warning
    pub max_files_per_batch: usize,

    /// Files larger than this are skipped
    pub max_file_bytes: u64,

    /// Batches graded at once (1 = sequential)
    pub batch_concurrency: usize,

    /// Prompt template with `{rubric}` and `{code}` placeholders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            max_files_per_batch: grading::MAX_FILES_PER_BATCH,
            max_file_bytes: grading::DEFAULT_MAX_FILE_BYTES,
            batch_concurrency: grading::DEFAULT_BATCH_CONCURRENCY,
            prompt_template: None,
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address `repograde serve` listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: network::DEFAULT_BIND.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_config() -> Config {
        let mut config = Config::default();
        config.llm.api_key = Some("secret".to_string());
        config.llm.endpoint = Some("https://example.openai.azure.com".to_string());
        config.llm.model = "gpt-4o".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "azure-openai");
        assert_eq!(config.llm.api_version, "2024-10-21");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.fetch.clone_timeout_secs, 300);
        assert_eq!(config.fetch.accepted_hosts, vec!["github.com", "github.io"]);
        assert_eq!(config.grading.max_files_per_batch, 5);
        assert_eq!(config.grading.batch_concurrency, 1);
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.grading.max_files_per_batch = 6;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.grading.batch_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.grading.prompt_template = Some("no placeholders".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_credentials_names_every_missing_variable() {
        let err = Config::default().require_credentials().unwrap_err();
        match err {
            GraderError::MissingEnvironment(names) => {
                assert_eq!(
                    names,
                    vec![
                        "AZURE_OPENAI_API_KEY",
                        "AZURE_OPENAI_ENDPOINT",
                        "AZURE_OPENAI_DEPLOYMENT_NAME"
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(azure_config().require_credentials().is_ok());
    }

    #[test]
    fn test_require_credentials_openai() {
        let mut config = Config::default();
        config.llm.provider = "openai".to_string();
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(
                config.require_credentials(),
                Err(GraderError::MissingEnvironment(_))
            ));
        }

        config.llm.api_key = Some("sk-test".to_string());
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let mut config = azure_config();
        config.llm.provider = "mystery".to_string();
        assert!(matches!(
            config.require_credentials(),
            Err(GraderError::Config(_))
        ));
    }

    #[test]
    fn test_api_key_never_serialized_or_debugged() {
        let config = azure_config();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("secret"));
        assert!(!format!("{:?}", config.llm).contains("secret"));
    }
}
