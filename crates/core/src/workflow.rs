//! Policy-quote workflow: owns the policy inputs, drives one pricing request
//! per submission and exposes immutable snapshots to the view layer.
//!
//! Submissions are numbered. Starting a new one cancels the request still in
//! flight, and a response is only applied while its sequence number is the
//! active one, so the latest submission always wins regardless of the order
//! in which responses arrive.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ApiError, PricingApi};
use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use crate::domain::events::HistoricalEvent;
use crate::domain::policy::{HistoricalOverride, PolicyInputs, QuoteRequest, RunKind};
use crate::domain::quote::QuoteResult;
use crate::errors::{DomainError, WorkflowError};
use crate::flows::{
    FlowContext, FlowEngine, FlowTransitionError, QuoteFlow, TransitionOutcome, WorkflowEvent,
    WorkflowStep,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const ACTOR: &str = "quote-workflow";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub sequence: u64,
    pub kind: RunKind,
    pub step: WorkflowStep,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<QuoteResult>,
    pub error: Option<String>,
    pub transitions: Vec<TransitionOutcome>,
}

impl WorkflowRun {
    /// A run that never reached the backend because its inputs were refused.
    fn refused(kind: RunKind, error: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            kind,
            step: WorkflowStep::Configuring,
            started_at: now,
            completed_at: Some(now),
            result: None,
            error: Some(error),
            transitions: Vec::new(),
        }
    }

    pub fn progress(&self) -> usize {
        step_progress(self)
    }

    /// Steps this run passed through, in order.
    pub fn steps_visited(&self) -> Vec<WorkflowStep> {
        let Some(first) = self.transitions.first() else {
            return vec![self.step];
        };
        let mut steps = vec![first.from];
        steps.extend(self.transitions.iter().map(|outcome| outcome.to));
        steps
    }

    pub fn succeeded(&self) -> bool {
        self.step == WorkflowStep::Reviewed && self.result.is_some()
    }
}

/// Index into the "Configure Policy / Run Analysis / Review Results" indicator.
pub fn step_progress(run: &WorkflowRun) -> usize {
    run.step.progress_index()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub inputs: PolicyInputs,
    pub step: WorkflowStep,
    pub progress: usize,
    pub current_run: Option<WorkflowRun>,
    pub can_submit: bool,
}

struct ActiveSubmission {
    sequence: u64,
    cancel: Arc<Notify>,
}

struct WorkflowState {
    inputs: PolicyInputs,
    step: WorkflowStep,
    last_sequence: u64,
    active: Option<ActiveSubmission>,
    current_run: Option<WorkflowRun>,
}

impl WorkflowState {
    fn new(inputs: PolicyInputs) -> Self {
        Self {
            inputs,
            step: WorkflowStep::Configuring,
            last_sequence: 0,
            active: None,
            current_run: None,
        }
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            inputs: self.inputs.clone(),
            step: self.step,
            progress: self.step.progress_index(),
            current_run: self.current_run.clone(),
            can_submit: self.step != WorkflowStep::Running,
        }
    }
}

struct PendingSubmission {
    request: QuoteRequest,
    run: WorkflowRun,
    cancel: Arc<Notify>,
}

pub struct QuoteWorkflow<A: ?Sized> {
    engine: FlowEngine<QuoteFlow>,
    sink: Arc<dyn AuditSink>,
    timeout: Duration,
    state: Mutex<WorkflowState>,
    updates: watch::Sender<WorkflowSnapshot>,
    api: Arc<A>,
}

impl<A> QuoteWorkflow<A>
where
    A: PricingApi + ?Sized,
{
    pub fn new(api: Arc<A>) -> Self {
        let state = WorkflowState::new(PolicyInputs::default());
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            engine: FlowEngine::default(),
            sink: Arc::new(TracingAuditSink),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            state: Mutex::new(state),
            updates,
            api,
        }
    }

    /// Applies to both the live and the historical endpoint.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_inputs(self, inputs: PolicyInputs) -> Self {
        {
            let mut state = self.lock_state();
            state.inputs = inputs;
            self.publish(&state);
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.lock_state().snapshot()
    }

    /// Receives a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.updates.subscribe()
    }

    pub fn update_inputs<F>(&self, edit: F) -> Result<PolicyInputs, WorkflowError>
    where
        F: FnOnce(&mut PolicyInputs),
    {
        let mut state = self.lock_state();
        if !state.step.accepts_input_edits() {
            return Err(WorkflowError::InputsLocked);
        }
        edit(&mut state.inputs);
        let inputs = state.inputs.clone();
        self.publish(&state);
        Ok(inputs)
    }

    /// Prices `inputs` once. Never fails: transport and validation problems
    /// come back as a `Configuring` run carrying a displayable error.
    ///
    /// Calling this while another submission is running supersedes it.
    pub async fn submit(
        &self,
        inputs: PolicyInputs,
        historical: Option<HistoricalOverride>,
    ) -> WorkflowRun {
        let request = build_request(inputs, historical);
        let kind = request.kind();
        match self.begin(request, false) {
            Ok(pending) => self.complete(pending).await,
            Err(error) => WorkflowRun::refused(kind, error_message(error)),
        }
    }

    /// Like [`submit`](Self::submit) but refuses to start while a submission
    /// is already running.
    pub async fn try_submit(
        &self,
        inputs: PolicyInputs,
        historical: Option<HistoricalOverride>,
    ) -> Result<WorkflowRun, WorkflowError> {
        let pending = self.begin(build_request(inputs, historical), true)?;
        Ok(self.complete(pending).await)
    }

    pub async fn submit_historical_event(
        &self,
        inputs: PolicyInputs,
        event: &HistoricalEvent,
    ) -> WorkflowRun {
        self.submit(inputs, Some(event.to_override())).await
    }

    /// Aborts the running submission and returns to `Configuring`.
    pub fn cancel(&self) -> Result<WorkflowRun, WorkflowError> {
        let mut state = self.lock_state();
        let Some(mut run) = state.current_run.take() else {
            return Err(flow_error(FlowTransitionError::InvalidTransition {
                step: state.step,
                event: WorkflowEvent::Cancelled,
            }));
        };
        let audit = self.audit_context(run.id, run.sequence);
        let outcome = match self.engine.apply_with_audit(
            &state.step,
            &WorkflowEvent::Cancelled,
            &FlowContext::default(),
            self.sink.as_ref(),
            &audit,
        ) {
            Ok(outcome) => outcome,
            Err(error) => {
                state.current_run = Some(run);
                return Err(flow_error(error));
            }
        };

        if let Some(active) = state.active.take() {
            active.cancel.notify_one();
        }
        state.step = outcome.to;
        run.step = outcome.to;
        run.completed_at = Some(Utc::now());
        run.error = Some(ApiError::Cancelled.to_string());
        run.transitions.push(outcome);
        state.current_run = Some(run.clone());
        self.publish(&state);

        info!(
            event_name = "workflow.submit.cancelled",
            correlation_id = %run.id,
            sequence = run.sequence,
            "submission cancelled"
        );
        Ok(run)
    }

    /// Drops the current run and any request still in flight.
    pub fn reset(&self) -> Result<TransitionOutcome, WorkflowError> {
        let mut state = self.lock_state();
        let audit = self.audit_context(Uuid::nil(), state.last_sequence);
        let outcome = self
            .engine
            .apply_with_audit(
                &state.step,
                &WorkflowEvent::Reset,
                &FlowContext::default(),
                self.sink.as_ref(),
                &audit,
            )
            .map_err(flow_error)?;

        if let Some(active) = state.active.take() {
            active.cancel.notify_one();
        }
        state.step = outcome.to;
        state.current_run = None;
        self.publish(&state);
        Ok(outcome)
    }

    fn begin(
        &self,
        request: QuoteRequest,
        exclusive: bool,
    ) -> Result<PendingSubmission, WorkflowError> {
        let mut state = self.lock_state();
        if exclusive && state.step == WorkflowStep::Running {
            return Err(WorkflowError::Busy);
        }

        let sequence = state.last_sequence + 1;
        let run_id = Uuid::new_v4();
        let context = FlowContext {
            input_errors: match request.validate() {
                Ok(()) => Vec::new(),
                Err(DomainError::InvalidPolicyInput(message)) => vec![message],
                Err(other) => vec![other.to_string()],
            },
        };
        let outcome = self
            .engine
            .apply_with_audit(
                &state.step,
                &WorkflowEvent::Submitted,
                &context,
                self.sink.as_ref(),
                &self.audit_context(run_id, sequence),
            )
            .map_err(|error| match error {
                FlowTransitionError::InvalidInputs { errors, .. } => {
                    WorkflowError::Domain(DomainError::InvalidPolicyInput(errors.join("; ")))
                }
                other => flow_error(other),
            })?;

        state.last_sequence = sequence;
        if let Some(previous) = state.active.take() {
            previous.cancel.notify_one();
            info!(
                event_name = "workflow.submit.superseded",
                superseded_sequence = previous.sequence,
                sequence,
                "newer submission supersedes the request in flight"
            );
        }

        let cancel = Arc::new(Notify::new());
        let run = WorkflowRun {
            id: run_id,
            sequence,
            kind: request.kind(),
            step: outcome.to,
            started_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
            transitions: vec![outcome],
        };
        state.step = run.step;
        state.inputs = request.inputs.clone();
        state.active = Some(ActiveSubmission { sequence, cancel: Arc::clone(&cancel) });
        state.current_run = Some(run.clone());
        self.publish(&state);

        info!(
            event_name = "workflow.submit.started",
            correlation_id = %run.id,
            sequence,
            kind = ?run.kind,
            asset_value_millions = request.inputs.asset_value_millions,
            shielding_level = %request.inputs.shielding_level,
            "submission started"
        );
        Ok(PendingSubmission { request, run, cancel })
    }

    async fn complete(&self, pending: PendingSubmission) -> WorkflowRun {
        let PendingSubmission { request, mut run, cancel } = pending;
        let timeout_secs = self.timeout.as_secs();

        let response = tokio::select! {
            biased;
            _ = cancel.notified() => Err(ApiError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, self.api.run_quote(&request)) => {
                outcome.unwrap_or(Err(ApiError::Timeout { secs: timeout_secs }))
            }
        };

        let mut state = self.lock_state();
        let is_current = state.active.as_ref().map(|active| active.sequence) == Some(run.sequence);
        if !is_current {
            let latest_sequence = state.last_sequence;
            let finalized =
                state.current_run.as_ref().filter(|current| current.sequence == run.sequence).cloned();
            drop(state);
            return match finalized {
                Some(finalized) => finalized,
                None => self.discard(run, response.is_ok(), latest_sequence),
            };
        }
        state.active = None;

        let event = if response.is_ok() {
            WorkflowEvent::ResponseReceived
        } else {
            WorkflowEvent::RequestFailed
        };
        match self.engine.apply_with_audit(
            &state.step,
            &event,
            &FlowContext::default(),
            self.sink.as_ref(),
            &self.audit_context(run.id, run.sequence),
        ) {
            Ok(outcome) => {
                run.step = outcome.to;
                run.transitions.push(outcome);
            }
            Err(error) => {
                warn!(
                    event_name = "workflow.submit.inconsistent_step",
                    correlation_id = %run.id,
                    error = %error,
                    "active submission resolved outside the running step"
                );
                run.step = WorkflowStep::Configuring;
            }
        }
        run.completed_at = Some(Utc::now());

        match response {
            Ok(result) => {
                info!(
                    event_name = "workflow.submit.reviewed",
                    correlation_id = %run.id,
                    sequence = run.sequence,
                    policy_status = ?result.status(),
                    "pricing result received"
                );
                run.result = Some(result);
            }
            Err(error) => {
                warn!(
                    event_name = "workflow.submit.failed",
                    correlation_id = %run.id,
                    sequence = run.sequence,
                    error_class = error.class(),
                    error = %error,
                    "pricing request failed"
                );
                run.error = Some(error.to_string());
            }
        }

        state.step = run.step;
        state.current_run = Some(run.clone());
        self.publish(&state);
        run
    }

    /// Closes out a run whose response arrived after it stopped being current.
    fn discard(&self, mut run: WorkflowRun, had_result: bool, latest_sequence: u64) -> WorkflowRun {
        let reason = if latest_sequence > run.sequence {
            format!("superseded by submission #{latest_sequence}")
        } else {
            "discarded after workflow reset".to_string()
        };

        self.sink.emit(
            AuditEvent::new(
                &self.audit_context(run.id, run.sequence),
                "workflow.response_discarded",
                AuditCategory::Transport,
                AuditOutcome::Discarded,
            )
            .with_metadata("reason", reason.clone())
            .with_metadata("had_result", had_result.to_string()),
        );
        info!(
            event_name = "workflow.submit.discarded",
            correlation_id = %run.id,
            sequence = run.sequence,
            reason = %reason,
            "stale response discarded"
        );

        if let Ok(outcome) = self.engine.apply(
            &WorkflowStep::Running,
            &WorkflowEvent::Cancelled,
            &FlowContext::default(),
        ) {
            run.step = outcome.to;
            run.transitions.push(outcome);
        }
        run.completed_at = Some(Utc::now());
        run.error = Some(reason);
        run
    }

    fn audit_context(&self, run_id: Uuid, sequence: u64) -> AuditContext {
        AuditContext::new(Some(run_id), Some(sequence), run_id.to_string(), ACTOR)
    }

    fn publish(&self, state: &WorkflowState) {
        self.updates.send_replace(state.snapshot());
    }

    fn lock_state(&self) -> MutexGuard<'_, WorkflowState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn build_request(inputs: PolicyInputs, historical: Option<HistoricalOverride>) -> QuoteRequest {
    match historical {
        Some(historical) => QuoteRequest::historical(inputs, historical),
        None => QuoteRequest::live(inputs),
    }
}

fn flow_error(error: FlowTransitionError) -> WorkflowError {
    WorkflowError::Domain(DomainError::FlowTransition(error))
}

fn error_message(error: WorkflowError) -> String {
    match error {
        WorkflowError::Domain(DomainError::InvalidPolicyInput(message)) => message,
        other => other.to_string(),
    }
}
