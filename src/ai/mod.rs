//! AI Integration Layer
//!
//! LLM providers, the grading prompt template, response normalization and
//! timeout handling.

pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use prompt::{DEFAULT_GRADING_TEMPLATE, PromptTemplate};
pub use provider::{
    AzureOpenAiProvider, ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmResponse,
    OpenAiProvider, ResponseMetadata, ResponseTiming, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout};
pub use validation::{ParsedGrade, normalize};
