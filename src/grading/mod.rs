//! Grading Pipeline
//!
//! [`BatchOrchestrator`] drives a run; [`GradingInvoker`] turns one loaded
//! batch into a model call.

mod invoker;
mod orchestrator;

pub use invoker::GradingInvoker;
pub use orchestrator::BatchOrchestrator;
