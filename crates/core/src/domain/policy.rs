use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const YEARS_IN_ORBIT_RANGE: RangeInclusive<u32> = 0..=20;
pub const ADJUSTMENT_FACTOR_RANGE: RangeInclusive<f64> = 0.5..=2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShieldingLevel {
    Standard,
    Hardened,
    #[serde(rename = "Light/Legacy")]
    LightLegacy,
}

impl ShieldingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Hardened => "Hardened",
            Self::LightLegacy => "Light/Legacy",
        }
    }

    /// Relative vulnerability shown next to the shielding choice.
    pub fn vulnerability(&self) -> &'static str {
        match self {
            Self::Standard => "Medium",
            Self::Hardened => "Low",
            Self::LightLegacy => "High",
        }
    }
}

impl fmt::Display for ShieldingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShieldingLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "hardened" => Ok(Self::Hardened),
            "light/legacy" | "light" | "legacy" | "light_legacy" => Ok(Self::LightLegacy),
            other => Err(DomainError::InvalidPolicyInput(format!(
                "unsupported shielding level `{other}` (expected standard|hardened|light/legacy)"
            ))),
        }
    }
}

/// User-edited policy parameters. Field names match the backend request body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyInputs {
    pub asset_value_millions: f64,
    pub shielding_level: ShieldingLevel,
    pub years_in_orbit: u32,
    pub adjustment_factor: f64,
}

impl Default for PolicyInputs {
    fn default() -> Self {
        Self {
            asset_value_millions: 300.0,
            shielding_level: ShieldingLevel::Standard,
            years_in_orbit: 5,
            adjustment_factor: 1.0,
        }
    }
}

impl PolicyInputs {
    pub fn asset_value_usd(&self) -> f64 {
        self.asset_value_millions * 1_000_000.0
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.asset_value_millions.is_finite() || self.asset_value_millions <= 0.0 {
            return Err(DomainError::InvalidPolicyInput(format!(
                "asset_value_millions must be greater than zero (got {})",
                self.asset_value_millions
            )));
        }

        if !YEARS_IN_ORBIT_RANGE.contains(&self.years_in_orbit) {
            return Err(DomainError::InvalidPolicyInput(format!(
                "years_in_orbit must be in range {}..={} (got {})",
                YEARS_IN_ORBIT_RANGE.start(),
                YEARS_IN_ORBIT_RANGE.end(),
                self.years_in_orbit
            )));
        }

        if !self.adjustment_factor.is_finite()
            || !ADJUSTMENT_FACTOR_RANGE.contains(&self.adjustment_factor)
        {
            return Err(DomainError::InvalidPolicyInput(format!(
                "adjustment_factor must be in range {}..={} (got {})",
                ADJUSTMENT_FACTOR_RANGE.start(),
                ADJUSTMENT_FACTOR_RANGE.end(),
                self.adjustment_factor
            )));
        }

        Ok(())
    }
}

/// Prices the policy against a past storm instead of the live forecast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOverride {
    pub historical_kp: f64,
    pub historical_event_name: String,
    pub historical_date: String,
}

impl HistoricalOverride {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.historical_kp.is_finite() || self.historical_kp < 0.0 {
            return Err(DomainError::InvalidPolicyInput(format!(
                "historical_kp must be a non-negative number (got {})",
                self.historical_kp
            )));
        }
        if self.historical_event_name.trim().is_empty() {
            return Err(DomainError::InvalidPolicyInput(
                "historical_event_name must not be empty".to_string(),
            ));
        }
        if self.historical_date.trim().is_empty() {
            return Err(DomainError::InvalidPolicyInput(
                "historical_date must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Live,
    Historical,
}

/// Outgoing body for `/api/run` and `/api/run-historical`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteRequest {
    #[serde(flatten)]
    pub inputs: PolicyInputs,
    #[serde(flatten)]
    pub historical: Option<HistoricalOverride>,
}

impl QuoteRequest {
    pub fn live(inputs: PolicyInputs) -> Self {
        Self { inputs, historical: None }
    }

    pub fn historical(inputs: PolicyInputs, historical: HistoricalOverride) -> Self {
        Self { inputs, historical: Some(historical) }
    }

    pub fn kind(&self) -> RunKind {
        if self.historical.is_some() {
            RunKind::Historical
        } else {
            RunKind::Live
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.inputs.validate()?;
        if let Some(historical) = &self.historical {
            historical.validate()?;
        }
        Ok(())
    }
}
