use std::sync::Arc;

use borealis_core::assessment::{
    classify_premium_affordability, classify_risk_level, premium_display, PremiumDisplay,
};
use borealis_core::config::LoadOptions;
use borealis_core::domain::events::HistoricalCatalog;
use borealis_core::domain::geomag::KpIndex;
use borealis_core::domain::policy::{HistoricalOverride, PolicyInputs, RunKind, ShieldingLevel};
use borealis_core::domain::quote::PolicyStatus;
use borealis_core::errors::{ApplicationError, DomainError};
use borealis_core::flows::WorkflowStep;
use borealis_core::workflow::{QuoteWorkflow, WorkflowRun};
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::commands::{
    block_on, build_client, load_config, runtime_failure, CommandResult, EXIT_BACKEND, EXIT_OK,
};

const COMMAND: &str = "quote";

/// Policy inputs not given on the command line fall back to `defaults.*`.
#[derive(Clone, Debug, Default, Args)]
pub struct QuoteArgs {
    #[arg(long = "asset-value", help = "Insured asset value in millions of USD")]
    pub asset_value: Option<f64>,
    #[arg(long, help = "Shielding level: Standard, Hardened or Light/Legacy")]
    pub shielding: Option<ShieldingLevel>,
    #[arg(long, help = "Years the satellite has been in orbit (0-20)")]
    pub years: Option<u32>,
    #[arg(long, help = "Underwriter adjustment factor (0.5-2.0)")]
    pub adjustment: Option<f64>,
    #[arg(
        long,
        conflicts_with_all = ["historical_kp", "event_name", "event_date"],
        help = "Replay a storm from the built-in catalog by name"
    )]
    pub event: Option<String>,
    #[arg(
        long = "historical-kp",
        requires_all = ["event_name", "event_date"],
        help = "Replay a custom historical Kp value"
    )]
    pub historical_kp: Option<f64>,
    #[arg(long = "event-name", requires = "historical_kp")]
    pub event_name: Option<String>,
    #[arg(long = "event-date", requires = "historical_kp")]
    pub event_date: Option<String>,
}

impl QuoteArgs {
    fn policy_inputs(&self, defaults: &PolicyInputs) -> PolicyInputs {
        PolicyInputs {
            asset_value_millions: self.asset_value.unwrap_or(defaults.asset_value_millions),
            shielding_level: self.shielding.unwrap_or(defaults.shielding_level),
            years_in_orbit: self.years.unwrap_or(defaults.years_in_orbit),
            adjustment_factor: self.adjustment.unwrap_or(defaults.adjustment_factor),
        }
    }

    fn historical_override(&self) -> Result<Option<HistoricalOverride>, DomainError> {
        if let Some(name) = &self.event {
            let catalog = HistoricalCatalog::builtin();
            let event = catalog.find(name).ok_or_else(|| {
                let known: Vec<&str> =
                    catalog.events().iter().map(|event| event.name.as_str()).collect();
                DomainError::InvalidPolicyInput(format!(
                    "unknown historical event `{name}`; known events: {}",
                    known.join(", ")
                ))
            })?;
            return Ok(Some(event.to_override()));
        }

        match (&self.historical_kp, &self.event_name, &self.event_date) {
            (Some(kp), Some(name), Some(date)) => Ok(Some(HistoricalOverride {
                historical_kp: *kp,
                historical_event_name: name.clone(),
                historical_date: date.clone(),
            })),
            (None, None, None) => Ok(None),
            _ => Err(DomainError::InvalidPolicyInput(
                "--historical-kp, --event-name and --event-date must be given together"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct QuoteReport {
    command: &'static str,
    status: &'static str,
    run_id: String,
    kind: RunKind,
    step: WorkflowStep,
    step_label: &'static str,
    progress: usize,
    steps_visited: Vec<WorkflowStep>,
    inputs: PolicyInputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<HistoricalOverride>,
    policy_status: Option<PolicyStatus>,
    premium: Option<PremiumDisplay>,
    affordability: Option<&'static str>,
    risk_level: Option<&'static str>,
    recommendation: Option<String>,
    worst_case_kp: Option<f64>,
    worst_case_g_scale: Option<&'static str>,
    error: Option<String>,
}

impl QuoteReport {
    fn new(run: &WorkflowRun, inputs: PolicyInputs, event: Option<HistoricalOverride>) -> Self {
        let result = run.result.as_ref();
        let asset = inputs.asset_value_millions;
        let worst_case_kp = result.and_then(|result| result.worst_case_kp).map(KpIndex);

        Self {
            command: COMMAND,
            status: if run.succeeded() { "ok" } else { "error" },
            run_id: run.id.to_string(),
            kind: run.kind,
            step: run.step,
            step_label: run.step.label(),
            progress: run.progress(),
            steps_visited: run.steps_visited(),
            event,
            policy_status: result.map(|result| result.status()),
            premium: result.map(|result| premium_display(result, asset)),
            affordability: result
                .and_then(|result| classify_premium_affordability(result, asset))
                .map(|tier| tier.label()),
            risk_level: result.and_then(classify_risk_level).map(|level| level.label()),
            recommendation: result
                .map(|result| result.portfolio_assessment.strategic_recommendation.clone())
                .filter(|recommendation| !recommendation.is_empty()),
            worst_case_kp: worst_case_kp.map(|kp| kp.display_value()),
            worst_case_g_scale: worst_case_kp.map(|kp| kp.g_scale().label()),
            error: run.error.clone(),
            inputs,
        }
    }
}

pub fn run(options: &LoadOptions, args: QuoteArgs) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let inputs = args.policy_inputs(&config.defaults);
    let historical = match args.historical_override() {
        Ok(historical) => historical,
        Err(error) => {
            return CommandResult::from_application_error(
                COMMAND,
                ApplicationError::from(error),
                "cli-input",
            )
        }
    };

    let client = match build_client(COMMAND, &config) {
        Ok(client) => client,
        Err(failure) => return failure,
    };
    let workflow = QuoteWorkflow::new(Arc::new(client))
        .with_timeout(config.api.timeout())
        .with_inputs(inputs.clone());

    let run = match block_on(workflow.submit(inputs.clone(), historical.clone())) {
        Ok(run) => run,
        Err(error) => return runtime_failure(COMMAND, error),
    };

    if run.transitions.is_empty() {
        // Refused before any request was issued.
        let message = run.error.clone().unwrap_or_default();
        return CommandResult::from_application_error(
            COMMAND,
            ApplicationError::from(DomainError::InvalidPolicyInput(message)),
            run.id.to_string(),
        );
    }

    info!(
        event_name = "cli.quote.completed",
        correlation_id = %run.id,
        step = ?run.step,
        "quote command finished"
    );

    let exit_code = if run.succeeded() { EXIT_OK } else { EXIT_BACKEND };
    CommandResult::report(COMMAND, exit_code, &QuoteReport::new(&run, inputs, historical))
}
