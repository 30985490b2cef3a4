use console::style;

use crate::types::{BatchResult, GradingOutcome};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Human-readable rendering of a whole grading run
    pub fn outcome(&self, outcome: &GradingOutcome) {
        match outcome {
            GradingOutcome::Completed(results) => {
                self.header("Grading Results");
                for result in results {
                    self.batch(result);
                }

                let graded = results.iter().filter(|r| r.is_success()).count();
                println!();
                if graded == results.len() {
                    self.success(&format!("{} of {} batches graded", graded, results.len()));
                } else {
                    self.warning(&format!("{} of {} batches graded", graded, results.len()));
                }
            }
            GradingOutcome::Failed { error } => self.error(&error.to_string()),
        }
    }

    pub fn batch(&self, result: &BatchResult) {
        self.section(&format!(
            "Batch {}: {}",
            result.batch_number(),
            result.files_analyzed().join(", ")
        ));

        match result {
            BatchResult::Success {
                rubric_score,
                hundred_point_score,
                review,
                ..
            } => {
                println!("Rubric score: {}", style(rubric_score).green().bold());
                println!("Score:        {}/100", style(hundred_point_score).bold());
                println!("\n{}", review);
            }
            BatchResult::Degraded { review, .. } => {
                self.warning("Response was not a structured grade; raw review follows");
                println!("\n{}", review);
            }
            BatchResult::Failure { error, .. } => self.error(error),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
