use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{
    FlowAction, FlowContext, TransitionOutcome, WorkflowEvent, WorkflowStep,
};

pub trait FlowDefinition {
    fn initial_step(&self) -> WorkflowStep;
    fn transition(
        &self,
        current: &WorkflowStep,
        event: &WorkflowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Configure -> run -> review cycle of a single policy quote.
#[derive(Clone, Debug, Default)]
pub struct QuoteFlow;

impl FlowDefinition for QuoteFlow {
    fn initial_step(&self) -> WorkflowStep {
        WorkflowStep::Configuring
    }

    fn transition(
        &self,
        current: &WorkflowStep,
        event: &WorkflowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_quote(current, event, context)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_step(&self) -> WorkflowStep {
        self.flow.initial_step()
    }

    pub fn apply(
        &self,
        current: &WorkflowStep,
        event: &WorkflowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &WorkflowStep,
        event: &WorkflowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "workflow.transition_applied",
                        AuditCategory::Flow,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "workflow.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<QuoteFlow> {
    fn default() -> Self {
        Self::new(QuoteFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("policy inputs are invalid in step {step:?}: {errors:?}")]
    InvalidInputs { step: WorkflowStep, errors: Vec<String> },
    #[error("invalid transition from {step:?} using event {event:?}")]
    InvalidTransition { step: WorkflowStep, event: WorkflowEvent },
}

fn transition_quote(
    current: &WorkflowStep,
    event: &WorkflowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{CancelInFlight, ClearRun, IssueRequest, PublishResult, SurfaceError};
    use WorkflowEvent::{Cancelled, Reset, RequestFailed, ResponseReceived, Submitted};
    use WorkflowStep::{Configuring, Reviewed, Running};

    let (to, actions) = match (current, event) {
        (Configuring, Submitted) | (Reviewed, Submitted) | (Running, Submitted) => {
            if !context.input_errors.is_empty() {
                return Err(FlowTransitionError::InvalidInputs {
                    step: *current,
                    errors: context.input_errors.clone(),
                });
            }
            // A new submission supersedes whatever is still in flight.
            let actions = if *current == Running {
                vec![CancelInFlight, IssueRequest]
            } else {
                vec![IssueRequest]
            };
            (Running, actions)
        }
        (Running, ResponseReceived) => (Reviewed, vec![PublishResult]),
        (Running, RequestFailed) => (Configuring, vec![SurfaceError]),
        (Running, Cancelled) => (Configuring, vec![CancelInFlight, SurfaceError]),
        (Running, Reset) => (Configuring, vec![CancelInFlight, ClearRun]),
        (_, Reset) => (Configuring, vec![ClearRun]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition { step: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, QuoteFlow};
    use crate::flows::states::{FlowAction, FlowContext, WorkflowEvent, WorkflowStep};

    #[test]
    fn success_path_runs_configure_run_review() {
        let engine = FlowEngine::new(QuoteFlow);
        let context = FlowContext::default();
        let mut step = engine.initial_step();
        assert_eq!(step, WorkflowStep::Configuring);

        let submitted =
            engine.apply(&step, &WorkflowEvent::Submitted, &context).expect("configure -> run");
        assert_eq!(submitted.actions, vec![FlowAction::IssueRequest]);
        step = submitted.to;
        assert_eq!(step, WorkflowStep::Running);

        let reviewed = engine
            .apply(&step, &WorkflowEvent::ResponseReceived, &context)
            .expect("run -> review");
        assert_eq!(reviewed.to, WorkflowStep::Reviewed);
        assert_eq!(reviewed.actions, vec![FlowAction::PublishResult]);
    }

    #[test]
    fn failure_returns_to_configuring() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&WorkflowStep::Running, &WorkflowEvent::RequestFailed, &FlowContext::default())
            .expect("run -> configure");

        assert_eq!(outcome.to, WorkflowStep::Configuring);
        assert_eq!(outcome.actions, vec![FlowAction::SurfaceError]);
    }

    #[test]
    fn resubmitting_while_running_cancels_the_previous_request() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&WorkflowStep::Running, &WorkflowEvent::Submitted, &FlowContext::default())
            .expect("run -> run");

        assert_eq!(outcome.to, WorkflowStep::Running);
        assert_eq!(outcome.actions, vec![FlowAction::CancelInFlight, FlowAction::IssueRequest]);
    }

    #[test]
    fn responses_outside_running_are_rejected() {
        let engine = FlowEngine::default();
        for step in [WorkflowStep::Configuring, WorkflowStep::Reviewed] {
            for event in [
                WorkflowEvent::ResponseReceived,
                WorkflowEvent::RequestFailed,
                WorkflowEvent::Cancelled,
            ] {
                let error = engine
                    .apply(&step, &event, &FlowContext::default())
                    .expect_err("only a running submission can resolve");
                assert_eq!(error, FlowTransitionError::InvalidTransition { step, event });
            }
        }
    }

    #[test]
    fn invalid_inputs_block_submission() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(
                &WorkflowStep::Configuring,
                &WorkflowEvent::Submitted,
                &FlowContext { input_errors: vec!["asset_value_millions".to_owned()] },
            )
            .expect_err("must reject invalid inputs");

        assert!(matches!(error, FlowTransitionError::InvalidInputs { .. }));
    }

    #[test]
    fn reset_is_accepted_from_every_step() {
        let engine = FlowEngine::default();
        for step in [WorkflowStep::Configuring, WorkflowStep::Running, WorkflowStep::Reviewed] {
            let outcome = engine
                .apply(&step, &WorkflowEvent::Reset, &FlowContext::default())
                .expect("reset always applies");
            assert_eq!(outcome.to, WorkflowStep::Configuring);
            assert!(outcome.actions.contains(&FlowAction::ClearRun));
        }
        assert_eq!(QuoteFlow.initial_step(), WorkflowStep::Configuring);
    }

    #[test]
    fn step_progress_indexes_match_labels() {
        assert_eq!(WorkflowStep::Configuring.progress_index(), 0);
        assert_eq!(WorkflowStep::Running.progress_index(), 1);
        assert_eq!(WorkflowStep::Reviewed.progress_index(), 2);
        assert_eq!(WorkflowStep::Reviewed.label(), "Review Results");
    }

    #[test]
    fn flow_transition_emits_audit_event() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();

        let _ = engine
            .apply_with_audit(
                &WorkflowStep::Configuring,
                &WorkflowEvent::Submitted,
                &FlowContext::default(),
                &sink,
                &AuditContext::new(None, Some(1), "req-42", "quote-workflow"),
            )
            .expect("transition should succeed");
        let _ = engine.apply_with_audit(
            &WorkflowStep::Configuring,
            &WorkflowEvent::ResponseReceived,
            &FlowContext::default(),
            &sink,
            &AuditContext::new(None, Some(1), "req-42", "quote-workflow"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].correlation_id, "req-42");
        assert_eq!(events[0].event_type, "workflow.transition_applied");
        assert_eq!(events[1].event_type, "workflow.transition_rejected");
    }
}
