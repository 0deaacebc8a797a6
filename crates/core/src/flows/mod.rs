pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, QuoteFlow};
pub use states::{
    FlowAction, FlowContext, TransitionOutcome, WorkflowEvent, WorkflowStep, STEP_LABELS,
};
