//! Grading Invoker
//!
//! Renders one batch into a prompt and sends it to the LLM provider.

use std::time::Duration;
use tracing::{debug, info};

use crate::ai::prompt::PromptTemplate;
use crate::ai::provider::SharedProvider;
use crate::ai::timeout::with_timeout;
use crate::constants::grading::SECTION_RULE_WIDTH;
use crate::types::{ErrorCategory, GraderError, LlmError, Result};
use crate::workspace::LoadedFileSet;

pub struct GradingInvoker {
    provider: SharedProvider,
    template: PromptTemplate,
    timeout: Duration,
}

impl GradingInvoker {
    pub fn new(provider: SharedProvider, template: PromptTemplate, timeout: Duration) -> Self {
        Self {
            provider,
            template,
            timeout,
        }
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    /// `File <n>: <path>` header, a rule, then the content; sections separated by a blank line
    pub fn format_code_sections(files: &LoadedFileSet) -> String {
        let rule = "=".repeat(SECTION_RULE_WIDTH);

        files
            .iter()
            .enumerate()
            .map(|(idx, (path, content))| {
                format!("File {}: {}\n{}\n{}\n", idx + 1, path, rule, content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_prompt(&self, files: &LoadedFileSet, rubric_text: &str) -> String {
        self.template
            .render(rubric_text, &Self::format_code_sections(files))
    }

    /// Send the batch and return the model's raw text
    pub async fn invoke(&self, files: &LoadedFileSet, rubric_text: &str) -> Result<String> {
        let prompt = self.render_prompt(files, rubric_text);
        debug!(
            "Prompt for {} file(s): {} chars",
            files.len(),
            prompt.len()
        );

        let response = with_timeout(
            self.timeout,
            self.provider.generate(&prompt),
            "LLM grading request",
        )
        .await
        .map_err(|e| match e {
            GraderError::Timeout {
                operation,
                duration,
            } => LlmError::with_provider(
                ErrorCategory::Network,
                format!("{} timed out after {:?}", operation, duration),
                self.provider.name(),
            )
            .into(),
            other => other,
        })?;

        info!(
            "{} answered in {}ms ({} tokens)",
            response.metadata.provider,
            response.timing.total_ms,
            response.usage.total()
        );

        Ok(response.content)
    }
}
