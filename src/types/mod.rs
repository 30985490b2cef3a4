pub mod error;
pub mod grading;

pub use error::{ErrorCategory, ErrorClassifier, GraderError, LlmError, Result};
pub use grading::{
    BatchReport, BatchResult, BatchStatus, GradeResponse, GradingOutcome, GradingRequest, Rubric,
};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Identifier attached to every log line of one grading run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
