//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Repository acquisition constants
pub mod fetch {
    /// Clone binary invoked by the git fetcher
    pub const DEFAULT_GIT_BINARY: &str = "git";

    /// Shallow clone depth
    pub const DEFAULT_CLONE_DEPTH: u32 = 1;

    /// Clone timeout (seconds)
    pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 300;

    /// Host markers a repository reference must contain
    pub const DEFAULT_ACCEPTED_HOSTS: &[&str] = &["github.com", "github.io"];

    /// Prefix for temporary workspace directories
    pub const WORKSPACE_PREFIX: &str = "repograde-";

    /// Zip local file header magic
    pub const ZIP_MAGIC: &[u8] = b"PK";

    /// Smallest byte count that can hold a zip header signature
    pub const MIN_ARCHIVE_BYTES: usize = 4;

    /// Directory skipped while walking a workspace
    pub const VCS_DIR: &str = ".git";
}

/// Batch grading constants
pub mod grading {
    /// Maximum files graded in one model call
    pub const MAX_FILES_PER_BATCH: usize = 5;

    /// Files larger than this are skipped by the loader (1MB)
    pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

    /// Batches graded at once; 1 keeps batches strictly sequential
    pub const DEFAULT_BATCH_CONCURRENCY: usize = 1;

    /// Width of the `=` rule under each file header in the prompt
    pub const SECTION_RULE_WIDTH: usize = 60;

    /// Score reported for a batch whose model output could not be parsed
    pub const DEGRADED_SCORE_LABEL: &str = "Error parsing score";
}

/// LLM provider constants
pub mod llm {
    /// Provider used when none is configured
    pub const DEFAULT_PROVIDER: &str = "azure-openai";

    /// Azure OpenAI REST API version
    pub const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";

    /// OpenAI-compatible API base
    pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

    /// Grading is deterministic
    pub const DEFAULT_TEMPERATURE: f32 = 0.0;

    /// Upper bound on completion tokens
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;

    /// Environment variables read for the Azure provider
    pub mod env {
        pub const API_KEY: &str = "AZURE_OPENAI_API_KEY";
        pub const ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
        pub const DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
        pub const API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
    }
}

/// HTTP/Network constants
pub mod network {
    /// Default LLM request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Default bind address for `repograde serve`
    pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
}
