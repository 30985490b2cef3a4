//! repograde - LLM-Backed Rubric Grading for Source Repositories
//!
//! Fetches a repository (git URL or zip archive) into a temporary workspace,
//! loads caller-declared batches of files, asks a chat-completion model to
//! grade each batch against a free-text rubric, and returns one result per
//! batch in declared order.
//!
//! ## Quick Start
//!
//! ```ignore
//! use repograde::{BatchOrchestrator, ConfigLoader, GitFetcher, Rubric, create_provider};
//!
//! let config = ConfigLoader::load()?;
//! let provider = create_provider(&config.llm)?;
//! let fetcher = Arc::new(GitFetcher::from_config(&config.fetch));
//! let orchestrator = BatchOrchestrator::from_config(&config, fetcher, provider)?;
//!
//! let rubric = Rubric::new("Clear naming (5 pts)", vec![vec!["main.py".into()]]);
//! let outcome = orchestrator.run("https://github.com/user/repo", &rubric).await;
//! ```
//!
//! ## Modules
//!
//! - [`workspace`]: repository fetchers, file location, batch loading
//! - [`ai`]: LLM providers, prompt template, response normalization
//! - [`grading`]: per-batch invocation and run orchestration
//! - [`server`]: axum HTTP service
//! - [`config`]: figment-layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod grading;
pub mod server;
pub mod types;
pub mod workspace;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, GraderError, LlmError, Result};

// Domain Types
pub use types::{
    BatchReport, BatchResult, BatchStatus, GradeResponse, GradingOutcome, GradingRequest, Rubric,
    RunId,
};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use grading::{BatchOrchestrator, GradingInvoker};
pub use workspace::{ArchiveFetcher, BatchLoader, GitFetcher, RepositoryFetcher, Workspace};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    LlmProvider, LlmResponse, PromptTemplate, SharedProvider, TimeoutConfig, create_provider,
    with_timeout,
};
