use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::geomag::{DailyGeomag, Portfolio, ThreeDayForecast};
use crate::domain::policy::{QuoteRequest, RunKind};
use crate::domain::quote::QuoteResult;

/// Backend endpoints this workspace talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Run,
    RunHistorical,
    Portfolio,
    DailyGeomag,
    ForecastThreeDay,
    Health,
}

impl Endpoint {
    pub fn for_run(kind: RunKind) -> Self {
        match kind {
            RunKind::Live => Self::Run,
            RunKind::Historical => Self::RunHistorical,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Run => "/api/run",
            Self::RunHistorical => "/api/run-historical",
            Self::Portfolio => "/api/portfolio",
            Self::DailyGeomag => "/api/daily-geomag",
            Self::ForecastThreeDay => "/api/forecast-3day",
            Self::Health => "/api/health",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {message}")]
    Network { endpoint: &'static str, message: String },
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("backend returned HTTP {status} for {endpoint}: {body}")]
    Status { endpoint: &'static str, status: u16, body: String },
    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: &'static str, message: String },
    #[error("request was cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "http_status",
            Self::Decode { .. } => "decode",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Pricing backend used by the quote workflow.
///
/// Implementations route live requests to `/api/run` and requests carrying a
/// historical override to `/api/run-historical`. They must not retry.
#[async_trait]
pub trait PricingApi: Send + Sync {
    async fn run_quote(&self, request: &QuoteRequest) -> Result<QuoteResult, ApiError>;
}

/// Read-only space-weather and portfolio endpoints.
#[async_trait]
pub trait SpaceWeatherApi: Send + Sync {
    async fn portfolio(&self) -> Result<Portfolio, ApiError>;
    async fn daily_geomag(&self, limit: u32) -> Result<DailyGeomag, ApiError>;
    async fn forecast_three_day(&self) -> Result<ThreeDayForecast, ApiError>;
    async fn health(&self) -> Result<Value, ApiError>;
}
