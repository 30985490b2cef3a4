//! CLI Input Helpers
//!
//! Parsing for the `grade` command's rubric file and batch list.

use std::path::Path;

use crate::types::{GraderError, Result};

const BATCH_SPEC_EXAMPLE: &str = "[[file1.py,file2.py],[file3.py]]";

/// Read a rubric file: must exist, end in `.txt`, and hold non-blank text
pub fn read_rubric_file(path: &Path) -> Result<String> {
    let is_txt = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if !is_txt {
        return Err(GraderError::InvalidRubric(format!(
            "Rubric file must be a text file (.txt), got: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(GraderError::InvalidRubric(format!(
            "Rubric file '{}' not found",
            path.display()
        )));
    }

    let text = std::fs::read_to_string(path)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(GraderError::InvalidRubric(format!(
            "Rubric file '{}' is empty",
            path.display()
        )));
    }

    Ok(text.to_string())
}

/// Parse a batch list given as JSON (`[["a.py","b.py"],["c.py"]]`) or in the
/// unquoted shell-friendly form (`[[a.py,b.py],[c.py]]`)
pub fn parse_batch_spec(spec: &str) -> Result<Vec<Vec<String>>> {
    let spec = spec.trim();

    if let Ok(batches) = serde_json::from_str::<Vec<Vec<String>>>(spec) {
        return Ok(batches);
    }

    parse_unquoted(spec).ok_or_else(|| {
        GraderError::InvalidRubric(format!(
            "Cannot parse batches '{}'. Expected format: '{}'",
            spec, BATCH_SPEC_EXAMPLE
        ))
    })
}

fn parse_unquoted(spec: &str) -> Option<Vec<Vec<String>>> {
    let inner = spec.strip_prefix('[')?.strip_suffix(']')?.trim();
    let mut batches = Vec::new();
    let mut rest = inner;

    while !rest.is_empty() {
        let after_open = rest.strip_prefix('[')?;
        let close = after_open.find(']')?;
        let body = &after_open[..close];
        if body.contains('[') {
            return None;
        }

        let batch = body
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'').trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        batches.push(batch);

        rest = after_open[close + 1..].trim_start();
        if let Some(next) = rest.strip_prefix(',') {
            rest = next.trim_start();
            if rest.is_empty() {
                return None;
            }
        } else if !rest.is_empty() {
            return None;
        }
    }

    Some(batches)
}
