use serde::{Deserialize, Serialize};

/// Labels of the progress indicator, indexed by [`WorkflowStep::progress_index`].
pub const STEP_LABELS: [&str; 3] = ["Configure Policy", "Run Analysis", "Review Results"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    Configuring,
    Running,
    Reviewed,
}

impl WorkflowStep {
    pub fn progress_index(&self) -> usize {
        match self {
            Self::Configuring => 0,
            Self::Running => 1,
            Self::Reviewed => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        STEP_LABELS[self.progress_index()]
    }

    pub fn accepts_input_edits(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowEvent {
    Submitted,
    ResponseReceived,
    RequestFailed,
    Cancelled,
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub input_errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    IssueRequest,
    CancelInFlight,
    PublishResult,
    SurfaceError,
    ClearRun,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WorkflowStep,
    pub to: WorkflowStep,
    pub event: WorkflowEvent,
    pub actions: Vec<FlowAction>,
}
