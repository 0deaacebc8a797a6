use thiserror::Error;

use crate::api::ApiError;
use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("invalid policy input: {0}")]
    InvalidPolicyInput(String),
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("a submission is already running")]
    Busy,
    #[error("policy inputs cannot be edited while a submission is running")]
    InputsLocked,
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Workflow(WorkflowError),
    #[error("backend failure: {0}")]
    Backend(#[from] ApiError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<WorkflowError> for ApplicationError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::Domain(domain) => Self::Domain(domain),
            other => Self::Workflow(other),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The policy inputs could not be processed. Check inputs and try again."
            }
            Self::Conflict { .. } => "An analysis is already running. Wait for it to finish.",
            Self::ServiceUnavailable { .. } => {
                "The pricing service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Workflow(error) => {
                Self::Conflict { message: error.to_string(), correlation_id }
            }
            ApplicationError::Backend(error) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::ApiError;
    use crate::errors::{ApplicationError, DomainError, InterfaceError, WorkflowError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::InvalidPolicyInput(
            "asset_value_millions must be greater than zero".to_owned(),
        ))
        .into_interface("run-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "run-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The policy inputs could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn busy_workflow_maps_to_conflict() {
        let interface = ApplicationError::from(WorkflowError::Busy).into_interface("run-2");

        assert!(matches!(interface, InterfaceError::Conflict { .. }));
        assert_eq!(interface.correlation_id(), "run-2");
    }

    #[test]
    fn workflow_domain_errors_unwrap_to_domain() {
        let error = ApplicationError::from(WorkflowError::Domain(
            DomainError::InvalidPolicyInput("years_in_orbit".to_owned()),
        ));
        assert!(matches!(error, ApplicationError::Domain(_)));
    }

    #[test]
    fn backend_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::from(ApiError::Timeout { secs: 120 }).into_interface("run-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The pricing service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("api.base_url is not a URL".to_owned())
            .into_interface("run-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
