//! Unified Error Type System
//!
//! Centralized error types for the grading service.
//!
//! ## Error Groups
//!
//! - **Configuration**: missing credentials or invalid settings (fatal at startup)
//! - **Input**: invalid rubric, repository reference or archive (reject before any work)
//! - **Acquisition**: clone failure, clone timeout, missing git (abort the whole request)
//! - **Per-batch**: no files loaded, LLM invocation failure (recorded on the batch only)
//!
//! Provider failures carry an [`ErrorCategory`] so log lines and HTTP mappings
//! can tell rate limits from auth problems without string matching downstream.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Categories for LLM provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited by the provider
    RateLimit,
    /// Authentication failed (bad key, wrong deployment permissions)
    Auth,
    /// Network/connectivity issues
    Network,
    /// Deployment or endpoint not found / unavailable
    Unavailable,
    /// Invalid request (prompt too large, malformed body)
    BadRequest,
    /// Temporary server issues
    Transient,
    /// The provider answered without usable content
    EmptyResponse,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::EmptyResponse => write!(f, "EMPTY_RESPONSE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// LLM invocation error with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps provider failures onto categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a transport error message
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit") || lower.contains("too many requests") {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider);
        }

        if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("unreachable")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider);
        }

        if lower.contains("unauthorized") || lower.contains("api key") {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 413 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum GraderError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnvironment(Vec<String>),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Invalid rubric: {0}")]
    InvalidRubric(String),

    #[error("Invalid repository reference: {0}")]
    InvalidReference(String),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    // -------------------------------------------------------------------------
    // Acquisition Errors
    // -------------------------------------------------------------------------
    #[error("Git clone failed: {stderr}")]
    FetchFailed { stderr: String },

    #[error("Repository clone timed out after {duration:?}")]
    FetchTimeout { duration: Duration },

    #[error("{tool} is not installed. Please install {tool} to clone repositories.")]
    ToolMissing { tool: String },

    // -------------------------------------------------------------------------
    // Per-batch Errors
    // -------------------------------------------------------------------------
    #[error("No code files could be loaded")]
    NoFilesLoaded,

    #[error("LLM invocation failed: {0}")]
    Invoke(LlmError),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Server error: {0}")]
    Server(String),
}

impl From<LlmError> for GraderError {
    fn from(err: LlmError) -> Self {
        GraderError::Invoke(err)
    }
}

pub type Result<T> = std::result::Result<T, GraderError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl GraderError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Caller supplied something unusable; nothing was acquired
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRubric(_) | Self::InvalidReference(_) | Self::InvalidArchive(_)
        )
    }

    /// Repository acquisition failed after input validation passed
    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed { .. } | Self::FetchTimeout { .. } | Self::ToolMissing { .. }
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::EmptyResponse.to_string(), "EMPTY_RESPONSE");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "azure-openai");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "azure-openai");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let missing = ErrorClassifier::classify_http_status(404, "DeploymentNotFound", "azure-openai");
        assert_eq!(missing.category, ErrorCategory::Unavailable);

        let server_error = ErrorClassifier::classify_http_status(503, "Busy", "openai");
        assert_eq!(server_error.category, ErrorCategory::Transient);
    }

    #[test]
    fn test_classify_message() {
        let err = ErrorClassifier::classify("error sending request: connection refused", "openai");
        assert_eq!(err.category, ErrorCategory::Network);

        let err = ErrorClassifier::classify("Something weird happened", "openai");
        assert_eq!(err.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err_no_provider = LlmError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_missing_environment_lists_all_names() {
        let err = GraderError::MissingEnvironment(vec![
            "AZURE_OPENAI_API_KEY".to_string(),
            "AZURE_OPENAI_ENDPOINT".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: AZURE_OPENAI_API_KEY, AZURE_OPENAI_ENDPOINT"
        );
    }

    #[test]
    fn test_error_groups() {
        assert!(GraderError::InvalidRubric("empty".into()).is_input_error());
        assert!(GraderError::InvalidReference("x".into()).is_input_error());
        assert!(!GraderError::NoFilesLoaded.is_input_error());

        let timeout = GraderError::FetchTimeout {
            duration: Duration::from_secs(300),
        };
        assert!(timeout.is_acquisition_error());
        assert!(
            GraderError::ToolMissing {
                tool: "git".into()
            }
            .is_acquisition_error()
        );
        assert!(!GraderError::NoFilesLoaded.is_acquisition_error());
    }
}
