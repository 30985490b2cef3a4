//! Grading Domain Types
//!
//! Request, per-batch result and overall outcome of one grading run, plus the
//! wire shapes the HTTP layer and the CLI emit.

use serde::{Deserialize, Serialize};

use super::error::{GraderError, Result};
use crate::constants::grading::DEGRADED_SCORE_LABEL;

// =============================================================================
// Request
// =============================================================================

/// Inbound grading request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingRequest {
    /// Remote repository locator (GitHub URL)
    pub github_link: String,
    pub rubric: Rubric,
}

/// Grading criteria plus the caller's batch partition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Rubric {
    /// Criteria text handed to the model
    #[serde(rename = "rubric")]
    pub criteria_text: String,
    /// Ordered batches of filenames, each graded in one model call
    #[serde(default)]
    pub batches: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_points: Option<f64>,
}

impl Rubric {
    pub fn new(criteria_text: impl Into<String>, batches: Vec<Vec<String>>) -> Self {
        Self {
            criteria_text: criteria_text.into(),
            batches,
            total_points: None,
        }
    }

    pub fn with_total_points(mut self, total_points: f64) -> Self {
        self.total_points = Some(total_points);
        self
    }

    /// Reject rubrics that cannot be graded against
    pub fn validate(&self) -> Result<()> {
        if self.criteria_text.trim().is_empty() {
            return Err(GraderError::InvalidRubric(
                "rubric text cannot be empty".to_string(),
            ));
        }
        if let Some(idx) = self.batches.iter().position(|batch| batch.is_empty()) {
            return Err(GraderError::InvalidRubric(format!(
                "batch {} lists no files",
                idx + 1
            )));
        }
        if let Some(total) = self.total_points
            && !(total.is_finite() && total > 0.0)
        {
            return Err(GraderError::InvalidRubric(format!(
                "total_points must be a positive number, got {}",
                total
            )));
        }
        Ok(())
    }

    /// Criteria text as it is substituted into the prompt
    pub fn prompt_text(&self) -> String {
        let text = self.criteria_text.trim();
        match self.total_points {
            Some(total) if total.fract() == 0.0 => {
                format!("{}\n\nTotal points available: {}", text, total as i64)
            }
            Some(total) => format!("{}\n\nTotal points available: {}", text, total),
            None => text.to_string(),
        }
    }
}

// =============================================================================
// Batch Results
// =============================================================================

/// Terminal state of one batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchResult {
    /// The model returned a parsable grade
    Success {
        batch_number: usize,
        files_analyzed: Vec<String>,
        rubric_score: String,
        hundred_point_score: i64,
        review: String,
    },
    /// The model answered but the answer was not the expected JSON
    Degraded {
        batch_number: usize,
        files_analyzed: Vec<String>,
        review: String,
    },
    /// Loading or invocation failed; carries the requested filenames
    Failure {
        batch_number: usize,
        files_analyzed: Vec<String>,
        error: String,
    },
}

impl BatchResult {
    pub fn batch_number(&self) -> usize {
        match self {
            Self::Success { batch_number, .. }
            | Self::Degraded { batch_number, .. }
            | Self::Failure { batch_number, .. } => *batch_number,
        }
    }

    pub fn files_analyzed(&self) -> &[String] {
        match self {
            Self::Success { files_analyzed, .. }
            | Self::Degraded { files_analyzed, .. }
            | Self::Failure { files_analyzed, .. } => files_analyzed,
        }
    }

    pub fn status(&self) -> BatchStatus {
        match self {
            Self::Success { .. } => BatchStatus::Success,
            Self::Degraded { .. } => BatchStatus::Degraded,
            Self::Failure { .. } => BatchStatus::Failure,
        }
    }

    /// Degraded batches still count as having produced a result
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Degraded,
    Failure,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Success => write!(f, "success"),
            BatchStatus::Degraded => write!(f, "degraded"),
            BatchStatus::Failure => write!(f, "failure"),
        }
    }
}

/// Flat wire form of [`BatchResult`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReport {
    pub batch_number: usize,
    pub status: BatchStatus,
    pub success: bool,
    pub files_analyzed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hundred_point_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&BatchResult> for BatchReport {
    fn from(result: &BatchResult) -> Self {
        let mut report = BatchReport {
            batch_number: result.batch_number(),
            status: result.status(),
            success: result.is_success(),
            files_analyzed: result.files_analyzed().to_vec(),
            rubric_score: None,
            hundred_point_score: None,
            review: None,
            error: None,
        };

        match result {
            BatchResult::Success {
                rubric_score,
                hundred_point_score,
                review,
                ..
            } => {
                report.rubric_score = Some(rubric_score.clone());
                report.hundred_point_score = Some(*hundred_point_score);
                report.review = Some(review.clone());
            }
            BatchResult::Degraded { review, .. } => {
                report.rubric_score = Some(DEGRADED_SCORE_LABEL.to_string());
                report.review = Some(review.clone());
            }
            BatchResult::Failure { error, .. } => {
                report.error = Some(error.clone());
            }
        }

        report
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Result of one orchestrator run
#[derive(Debug)]
pub enum GradingOutcome {
    /// Every declared batch reached a terminal state (individual batches may have failed)
    Completed(Vec<BatchResult>),
    /// Input validation or repository acquisition failed before any batch ran
    Failed { error: GraderError },
}

impl GradingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn results(&self) -> &[BatchResult] {
        match self {
            Self::Completed(results) => results,
            Self::Failed { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&GraderError> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { error } => Some(error),
        }
    }

    pub fn to_response(&self) -> GradeResponse {
        match self {
            Self::Completed(results) => GradeResponse::Completed {
                success: true,
                analysis: results.iter().map(BatchReport::from).collect(),
                error: None,
            },
            Self::Failed { error } => GradeResponse::Failed {
                success: false,
                error: error.to_string(),
                batch_results: Vec::new(),
            },
        }
    }
}

/// Response payload served by `POST /grade`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GradeResponse {
    Completed {
        success: bool,
        analysis: Vec<BatchReport>,
        error: Option<String>,
    },
    Failed {
        success: bool,
        error: String,
        batch_results: Vec<BatchReport>,
    },
}
