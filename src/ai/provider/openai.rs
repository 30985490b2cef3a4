//! OpenAI API Provider
//!
//! LLM provider using OpenAI's Chat Completions API. The request/response
//! types and the send helper are shared with the Azure provider, which speaks
//! the same wire format.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use super::{LlmProvider, LlmResponse, ResponseMetadata, ResponseTiming, TokenUsage};
use crate::config::LlmConfig;
use crate::constants::{llm, network};
use crate::types::{ErrorCategory, ErrorClassifier, GraderError, LlmError, Result};

const PROVIDER_NAME: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| GraderError::MissingEnvironment(vec!["OPENAI_API_KEY".to_string()]))?;

        let api_base = config
            .endpoint
            .as_deref()
            .unwrap_or(llm::DEFAULT_OPENAI_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let model = if config.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: build_client(config.timeout())?,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    #[instrument(skip_all, fields(provider = PROVIDER_NAME, model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        info!(
            "Generating with OpenAI (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let start_time = Instant::now();
        let body = ChatCompletionRequest::single_user_message(
            Some(self.model.clone()),
            prompt,
            self.temperature,
            self.max_tokens,
        );
        let url = format!("{}/chat/completions", self.api_base);

        let request = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body);

        let (content, usage) = send_chat_completion(request, PROVIDER_NAME).await?;

        Ok(LlmResponse {
            content,
            usage,
            timing: ResponseTiming::from_duration(start_time.elapsed()),
            metadata: ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER_NAME.to_string(),
            },
        })
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Shared Chat Completions Plumbing
// =============================================================================

pub(super) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
        .build()
        .map_err(|e| GraderError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Send a prepared request and pull out the first choice's content
pub(super) async fn send_chat_completion(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> Result<(String, TokenUsage)> {
    debug!("Sending chat completion request to {}", provider);

    let response = request
        .send()
        .await
        .map_err(|e| ErrorClassifier::classify(&format!("request failed: {}", e), provider))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ErrorClassifier::classify_http_status(
            status.as_u16(),
            &format!("API error ({}): {}", status, body),
            provider,
        )
        .into());
    }

    let response_body: ChatCompletionResponse = response.json().await.map_err(|e| {
        LlmError::with_provider(
            ErrorCategory::Unknown,
            format!("Failed to parse response: {}", e),
            provider,
        )
    })?;

    let usage = response_body
        .usage
        .map(|u| TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    let content = response_body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            LlmError::with_provider(
                ErrorCategory::EmptyResponse,
                "No content in response",
                provider,
            )
        })?;

    debug!(
        "Received {} chars from {} ({} tokens)",
        content.len(),
        provider,
        usage.total()
    );

    Ok((content, usage))
}

#[derive(Debug, Serialize)]
pub(super) struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionRequest {
    pub(super) fn single_user_message(
        model: Option<String>,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
            max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
