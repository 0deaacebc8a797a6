pub mod api;
pub mod assessment;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod workflow;

pub use api::{ApiError, Endpoint, PricingApi, SpaceWeatherApi};
pub use assessment::{
    classify_premium_affordability, classify_risk_level, premium_display, PremiumAffordability,
    PremiumDisplay, RiskLevel,
};
pub use domain::events::{HistoricalCatalog, HistoricalEvent};
pub use domain::geomag::{GScale, KpBand, KpIndex};
pub use domain::policy::{HistoricalOverride, PolicyInputs, QuoteRequest, RunKind, ShieldingLevel};
pub use domain::quote::{PolicyStatus, QuoteOutcome, QuoteResult};
pub use errors::{ApplicationError, DomainError, InterfaceError, WorkflowError};
pub use flows::{WorkflowStep, STEP_LABELS};
pub use workflow::{step_progress, QuoteWorkflow, WorkflowRun, WorkflowSnapshot};
