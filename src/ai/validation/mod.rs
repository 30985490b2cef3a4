//! AI Response Validation
//!
//! Normalizes model output into grades. Malformed output is never an error:
//! it degrades to a result that carries the raw text for a human to read.

mod normalize;

pub use normalize::{ParsedGrade, normalize, strip_code_fences};
