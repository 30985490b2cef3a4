//! Azure OpenAI Provider
//!
//! Chat Completions against an Azure OpenAI deployment:
//! `POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}`
//! authenticated with the `api-key` header.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Instant;
use tracing::{info, instrument};
use url::Url;

use super::openai::{ChatCompletionRequest, build_client, send_chat_completion};
use super::{LlmProvider, LlmResponse, ResponseMetadata, ResponseTiming};
use crate::config::LlmConfig;
use crate::constants::llm::env;
use crate::types::{GraderError, Result};

const PROVIDER_NAME: &str = "azure-openai";

pub struct AzureOpenAiProvider {
    api_key: SecretString,
    deployment: String,
    completions_url: Url,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for AzureOpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .field("completions_url", &self.completions_url.as_str())
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl AzureOpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let mut missing = Vec::new();
        let api_key = non_blank(config.api_key.as_deref());
        let endpoint = non_blank(config.endpoint.as_deref());
        let deployment = non_blank(Some(&config.model));

        if api_key.is_none() {
            missing.push(env::API_KEY.to_string());
        }
        if endpoint.is_none() {
            missing.push(env::ENDPOINT.to_string());
        }
        if deployment.is_none() {
            missing.push(env::DEPLOYMENT.to_string());
        }

        let (Some(api_key), Some(endpoint), Some(deployment)) = (api_key, endpoint, deployment)
        else {
            return Err(GraderError::MissingEnvironment(missing));
        };

        let completions_url = completions_url(endpoint, deployment, &config.api_version)?;

        Ok(Self {
            api_key: SecretString::from(api_key.to_string()),
            deployment: deployment.to_string(),
            completions_url,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: build_client(config.timeout())?,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Build the deployment's chat completions URL
fn completions_url(endpoint: &str, deployment: &str, api_version: &str) -> Result<Url> {
    let mut base = Url::parse(endpoint)
        .map_err(|e| GraderError::Config(format!("Invalid Azure endpoint '{}': {}", endpoint, e)))?;

    // join() replaces the last path segment unless the base ends with '/'
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let mut url = base
        .join(&format!("openai/deployments/{}/chat/completions", deployment))
        .map_err(|e| GraderError::Config(format!("Invalid Azure deployment URL: {}", e)))?;

    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    #[instrument(skip_all, fields(provider = PROVIDER_NAME, deployment = %self.deployment))]
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        info!(
            "Generating with Azure OpenAI (deployment: {}, temperature: {})",
            self.deployment, self.temperature
        );

        let start_time = Instant::now();
        let body = ChatCompletionRequest::single_user_message(
            None,
            prompt,
            self.temperature,
            self.max_tokens,
        );

        let request = self
            .client
            .post(self.completions_url.clone())
            .header("api-key", self.api_key.expose_secret())
            .json(&body);

        let (content, usage) = send_chat_completion(request, PROVIDER_NAME).await?;

        Ok(LlmResponse {
            content,
            usage,
            timing: ResponseTiming::from_duration(start_time.elapsed()),
            metadata: ResponseMetadata {
                model: self.deployment.clone(),
                provider: PROVIDER_NAME.to_string(),
            },
        })
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.deployment
    }
}
