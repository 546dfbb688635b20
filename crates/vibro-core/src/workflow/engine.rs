use super::outputs::WorkflowOutputs;
use crate::domain::{VibroError, VibroResult};
use crate::planner::Plan;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl Display for SubmissionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Created,
    Waiting,
    Running,
    Finished,
    Failed { exit_status: i32, message: String },
    Cancelled,
}

impl SubmissionState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed { .. } | Self::Cancelled)
    }
}

/// External engine running the composite workflows.
pub trait WorkflowEngine {
    fn submit(&mut self, plan: &Plan) -> VibroResult<SubmissionId>;
    fn status(&self, id: &SubmissionId) -> VibroResult<SubmissionState>;
    fn cancel(&mut self, id: &SubmissionId) -> VibroResult<()>;
    fn outputs(&self, id: &SubmissionId) -> VibroResult<WorkflowOutputs>;
}

/// Result of asking for the outputs of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Ready(WorkflowOutputs),
    /// Still queued or running.
    NotReady,
    /// Cancelled; any partial results are dropped.
    Cleared,
}

pub fn submit_plan(engine: &mut dyn WorkflowEngine, plan: &Plan) -> VibroResult<SubmissionId> {
    let id = engine.submit(plan)?;
    info!(submission = %id, kind = ?plan.kind, protocol = %plan.protocol, "submitted plan");
    Ok(id)
}

pub fn extract_results(engine: &dyn WorkflowEngine, id: &SubmissionId) -> VibroResult<Extraction> {
    match engine.status(id)? {
        SubmissionState::Created | SubmissionState::Waiting | SubmissionState::Running => Ok(Extraction::NotReady),
        SubmissionState::Cancelled => Ok(Extraction::Cleared),
        SubmissionState::Failed { exit_status, message } => {
            warn!(submission = %id, exit_status, "upstream workflow failed");
            Err(VibroError::upstream_failed(format!(
                "submission {id} failed with exit status {exit_status}: {message}"
            )))
        }
        SubmissionState::Finished => engine.outputs(id).map(Extraction::Ready),
    }
}
