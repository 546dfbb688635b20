//! Boundary to the external workflow engine: submission, state polling,
//! cancellation and the namespace of upstream outputs.

pub mod engine;
pub mod outputs;

pub use engine::{Extraction, SubmissionId, SubmissionState, WorkflowEngine, extract_results, submit_plan};
pub use outputs::WorkflowOutputs;
