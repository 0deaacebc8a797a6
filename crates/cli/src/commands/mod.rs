pub mod config;
pub mod doctor;
pub mod events;
pub mod forecast;
pub mod health;
pub mod history;
pub mod portfolio;
pub mod quote;

use std::future::Future;

use anyhow::Context;
use borealis_client::HttpPricingClient;
use borealis_core::api::ApiError;
use borealis_core::config::{AppConfig, LoadOptions};
use borealis_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;

pub const EXIT_OK: u8 = 0;
pub const EXIT_RUNTIME: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_BACKEND: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            detail: None,
            correlation_id: None,
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            detail: None,
            correlation_id: None,
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Maps a layered application error onto its user-safe interface message.
    pub fn from_application_error(
        command: &str,
        error: ApplicationError,
        correlation_id: impl Into<String>,
    ) -> Self {
        let detail = error.to_string();
        let backend_class = match &error {
            ApplicationError::Backend(api) => Some(format!("backend_{}", api.class())),
            _ => None,
        };
        let interface = error.into_interface(correlation_id);
        let (error_class, exit_code) = match &interface {
            InterfaceError::BadRequest { .. } => ("input_validation", EXIT_INPUT),
            InterfaceError::Conflict { .. } => ("workflow_conflict", EXIT_INPUT),
            InterfaceError::ServiceUnavailable { .. } => {
                (backend_class.as_deref().unwrap_or("backend_unavailable"), EXIT_BACKEND)
            }
            InterfaceError::Internal { .. } => ("config_validation", EXIT_CONFIG),
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: interface.user_message().to_string(),
            detail: Some(detail),
            correlation_id: Some(interface.correlation_id().to_string()),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Serializes a command-specific report as the output.
    pub fn report<T: Serialize>(command: &str, exit_code: u8, report: &T) -> Self {
        match serde_json::to_string(report) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure(
                command,
                "serialization",
                format!("could not serialize report: {error}"),
                EXIT_RUNTIME,
            ),
        }
    }
}

pub(crate) fn load_config(command: &str, options: &LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::from_application_error(
            command,
            ApplicationError::Configuration(error.to_string()),
            format!("cli-{command}"),
        )
    })
}

pub(crate) fn build_client(
    command: &str,
    config: &AppConfig,
) -> Result<HttpPricingClient, CommandResult> {
    HttpPricingClient::from_config(&config.api).map_err(|error| {
        CommandResult::from_application_error(
            command,
            ApplicationError::Configuration(error.to_string()),
            format!("cli-{command}"),
        )
    })
}

/// Drives one async call on a private current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    Ok(runtime.block_on(future))
}

pub(crate) fn runtime_failure(command: &str, error: anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "runtime", format!("{error:#}"), EXIT_RUNTIME)
}

pub(crate) fn backend_failure(command: &str, error: ApiError) -> CommandResult {
    CommandResult::from_application_error(
        command,
        ApplicationError::Backend(error),
        format!("cli-{command}"),
    )
}

fn serialize_payload(payload: &CommandOutcome) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
