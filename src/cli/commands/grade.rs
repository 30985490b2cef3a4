//! Grade Command
//!
//! Grade one repository (git URL or local zip archive) from the terminal.
//!
//! Usage:
//!   repograde grade --repo https://github.com/user/repo --rubric-file rubric.txt --batches "[[main.py,utils.py]]"
//!   repograde grade --archive project.zip --rubric-file rubric.txt --batches '[["a.py"],["b.py"]]' -f json

use std::path::PathBuf;
use std::sync::Arc;

use crate::ai::create_provider;
use crate::cli::{Output, parse_batch_spec, read_rubric_file};
use crate::config::Config;
use crate::grading::BatchOrchestrator;
use crate::types::{GraderError, Result, Rubric};
use crate::workspace::{ArchiveFetcher, GitFetcher, SharedFetcher};

/// Where the code to grade comes from
#[derive(Debug, Clone)]
pub enum GradeSource {
    Repository(String),
    Archive(PathBuf),
}

#[derive(Debug, Clone)]
pub struct GradeOptions {
    pub source: GradeSource,
    pub rubric_file: PathBuf,
    pub batches: String,
    pub total_points: Option<f64>,
    pub format: String,
}

/// Run one grading; returns whether the run completed
pub async fn run(config: &Config, options: GradeOptions) -> Result<bool> {
    let as_json = match options.format.as_str() {
        "json" => true,
        "text" => false,
        other => {
            return Err(GraderError::Config(format!(
                "Invalid format '{}'. Valid values: text, json",
                other
            )));
        }
    };

    let mut rubric = Rubric::new(
        read_rubric_file(&options.rubric_file)?,
        parse_batch_spec(&options.batches)?,
    );
    if let Some(points) = options.total_points {
        rubric = rubric.with_total_points(points);
    }
    rubric.validate()?;

    config.require_credentials()?;
    let provider = create_provider(&config.llm)?;

    let (fetcher, reference): (SharedFetcher, String) = match options.source {
        GradeSource::Repository(url) => (Arc::new(GitFetcher::from_config(&config.fetch)), url),
        GradeSource::Archive(path) => {
            let is_zip = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
            if !is_zip {
                return Err(GraderError::InvalidArchive(format!(
                    "Repository must be a zip file (.zip), got: {}",
                    path.display()
                )));
            }
            (
                Arc::new(ArchiveFetcher::from_config(&config.fetch)),
                path.to_string_lossy().into_owned(),
            )
        }
    };

    if !as_json {
        Output::new().info(&format!(
            "Grading {} in {} batch(es) with {}",
            reference,
            rubric.batches.len(),
            provider.model()
        ));
    }

    let orchestrator = BatchOrchestrator::from_config(config, fetcher, provider)?;
    let outcome = orchestrator.run(&reference, &rubric).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome.to_response())?);
    } else {
        Output::new().outcome(&outcome);
    }

    Ok(outcome.is_success())
}
