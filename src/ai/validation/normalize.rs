//! Grade Response Normalization
//!
//! Turns the model's raw text into a [`ParsedGrade`]. Never fails: anything
//! that is not the expected JSON object becomes a degraded grade whose review
//! is the trimmed raw text.

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Normalized model output for one batch
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedGrade {
    Graded {
        rubric_score: String,
        hundred_point_score: i64,
        review: String,
    },
    Degraded {
        review: String,
    },
}

impl ParsedGrade {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Normalize a raw model response
pub fn normalize(raw: &str) -> ParsedGrade {
    let trimmed = raw.trim();
    let body = strip_code_fences(trimmed);

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Model response is not valid JSON: {}", e);
            return degraded(trimmed);
        }
    };

    let Some(object) = value.as_object() else {
        warn!("Model response is JSON but not an object");
        return degraded(trimmed);
    };

    match extract_fields(object) {
        Some(grade) => grade,
        None => {
            warn!("Model response is missing or has malformed grade fields");
            degraded(trimmed)
        }
    }
}

fn degraded(trimmed: &str) -> ParsedGrade {
    ParsedGrade::Degraded {
        review: trimmed.to_string(),
    }
}

/// Strip a leading ``` fence with its optional language tag and a trailing ``` fence
pub fn strip_code_fences(s: &str) -> &str {
    let mut result = s;

    // The tag may be followed by a newline or, on one-line answers, by the body itself
    if let Some(after_fence) = result.strip_prefix("```") {
        result = after_fence.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }

    if let Some(stripped) = result.strip_suffix("```") {
        result = stripped;
    }

    result.trim()
}

fn extract_fields(object: &Map<String, Value>) -> Option<ParsedGrade> {
    let rubric_score = match object.get("rubric_score")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let hundred_point_score = coerce_score(object.get("hundred_point_score")?)?;

    let review = match object.get("review")? {
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => serde_json::to_string_pretty(other).ok()?,
    };

    debug!(
        "Parsed grade: rubric_score={}, hundred_point_score={}",
        rubric_score, hundred_point_score
    );

    Some(ParsedGrade::Graded {
        rubric_score,
        hundred_point_score,
        review,
    })
}

/// Accept an integer, a float (rounded) or a numeric string
fn coerce_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(round_finite)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(round_finite))
        }
        _ => None,
    }
}

fn round_finite(f: f64) -> Option<i64> {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.round() as i64)
    } else {
        None
    }
}
