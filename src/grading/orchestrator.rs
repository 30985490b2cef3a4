//! Batch Orchestrator
//!
//! Single entry point for a grading run:
//!
//! 1. Validate the rubric (nothing is fetched for an invalid rubric)
//! 2. Fetch the repository into a workspace
//! 3. Per batch: load → invoke → normalize, one [`BatchResult`] each
//! 4. Remove the workspace
//!
//! Batch failures are recorded on the batch and never abort siblings. Only
//! rubric validation and repository acquisition produce
//! [`GradingOutcome::Failed`].

use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{error, info, instrument, warn};

use super::invoker::GradingInvoker;
use crate::ai::prompt::PromptTemplate;
use crate::ai::provider::SharedProvider;
use crate::ai::timeout::TimeoutConfig;
use crate::ai::validation::{ParsedGrade, normalize};
use crate::config::Config;
use crate::types::{BatchResult, GradingOutcome, Result, Rubric, RunId};
use crate::workspace::{BatchLoader, SharedFetcher};

pub struct BatchOrchestrator {
    fetcher: SharedFetcher,
    invoker: GradingInvoker,
    loader: BatchLoader,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(fetcher: SharedFetcher, invoker: GradingInvoker, loader: BatchLoader) -> Self {
        Self {
            fetcher,
            invoker,
            loader,
            concurrency: 1,
        }
    }

    /// Batches graded at once; results stay in declared order regardless
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn from_config(
        config: &Config,
        fetcher: SharedFetcher,
        provider: SharedProvider,
    ) -> Result<Self> {
        let template = PromptTemplate::from_option(config.grading.prompt_template.as_deref())?;
        let timeouts = TimeoutConfig::from_config(config);
        let invoker = GradingInvoker::new(provider, template, timeouts.llm_request);

        Ok(Self::new(fetcher, invoker, BatchLoader::from_config(&config.grading))
            .with_concurrency(config.grading.batch_concurrency))
    }

    pub fn provider(&self) -> &SharedProvider {
        self.invoker.provider()
    }

    #[instrument(
        skip_all,
        fields(run_id = %RunId::generate(), fetcher = self.fetcher.name(), batches = rubric.batches.len())
    )]
    pub async fn run(&self, source_reference: &str, rubric: &Rubric) -> GradingOutcome {
        if let Err(error) = rubric.validate() {
            warn!("Rejected rubric: {}", error);
            return GradingOutcome::Failed { error };
        }

        let workspace = match self.fetcher.fetch(source_reference).await {
            Ok(workspace) => workspace,
            Err(error) => {
                error!("Repository acquisition failed: {}", error);
                return GradingOutcome::Failed { error };
            }
        };

        let prompt_text = rubric.prompt_text();
        let rubric_text = prompt_text.as_str();
        let root = workspace.root();

        // Owned batch items keep the stream future `Send` for any borrow lifetime
        let results: Vec<BatchResult> = stream::iter(rubric.batches.iter().cloned().enumerate())
            .map(|(idx, filenames)| async move {
                self.grade_batch(root, idx + 1, &filenames, rubric_text).await
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        workspace.cleanup();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            "Graded {} batch(es), {} failed",
            results.len(),
            failed
        );

        GradingOutcome::Completed(results)
    }

    async fn grade_batch(
        &self,
        root: &Path,
        batch_number: usize,
        filenames: &[String],
        rubric_text: &str,
    ) -> BatchResult {
        info!(
            "Batch {}: grading {} file(s)",
            batch_number,
            filenames.len()
        );

        let failure = |error: String| BatchResult::Failure {
            batch_number,
            files_analyzed: filenames.to_vec(),
            error,
        };

        let files = match self.loader.load(root, filenames).await {
            Ok(files) => files,
            Err(e) => {
                warn!("Batch {}: {}", batch_number, e);
                return failure(e.to_string());
            }
        };

        let raw = match self.invoker.invoke(&files, rubric_text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Batch {}: {}", batch_number, e);
                return failure(e.to_string());
            }
        };

        let files_analyzed = files.paths();
        let result = match normalize(&raw) {
            ParsedGrade::Graded {
                rubric_score,
                hundred_point_score,
                review,
            } => BatchResult::Success {
                batch_number,
                files_analyzed,
                rubric_score,
                hundred_point_score,
                review,
            },
            ParsedGrade::Degraded { review } => BatchResult::Degraded {
                batch_number,
                files_analyzed,
                review,
            },
        };

        info!("Batch {}: {}", batch_number, result.status());
        result
    }
}
