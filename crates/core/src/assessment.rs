//! Presentation-ready readings of a [`QuoteResult`].
//!
//! Every function here is pure: it takes the raw backend payload and returns a
//! tagged variant, so the thresholds can be tested without any rendering.

use serde::Serialize;

use crate::domain::quote::QuoteResult;

pub const PREMIUM_HIGH_PCT: f64 = 5.0;
pub const PREMIUM_MODERATE_PCT: f64 = 2.0;
pub const RISK_HIGH_PCT: f64 = 1.0;
pub const RISK_MODERATE_PCT: f64 = 0.5;

/// Ordered from cheapest to most expensive so tiers compare naturally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PremiumAffordability {
    Competitive,
    Moderate,
    High,
}

impl PremiumAffordability {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage > PREMIUM_HIGH_PCT {
            Self::High
        } else if percentage > PREMIUM_MODERATE_PCT {
            Self::Moderate
        } else {
            Self::Competitive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Competitive => "Competitive",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_probability_pct(probability_pct: f64) -> Self {
        if probability_pct > RISK_HIGH_PCT {
            Self::High
        } else if probability_pct > RISK_MODERATE_PCT {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
        }
    }
}

/// Premium as a percentage of the insured asset value.
///
/// `None` when the policy was rejected, the backend sent no premium, or the
/// asset value is not positive.
pub fn premium_percentage(result: &QuoteResult, asset_value_millions: f64) -> Option<f64> {
    let premium = result.payable_premium_usd()?;
    let asset_value_usd = asset_value_millions * 1_000_000.0;
    if asset_value_usd.is_nan() || asset_value_usd <= 0.0 {
        return None;
    }
    // Scale before dividing so whole-dollar premiums land exactly on the thresholds.
    Some(premium * 100.0 / asset_value_usd)
}

pub fn classify_premium_affordability(
    result: &QuoteResult,
    asset_value_millions: f64,
) -> Option<PremiumAffordability> {
    premium_percentage(result, asset_value_millions).map(PremiumAffordability::from_percentage)
}

pub fn classify_risk_level(result: &QuoteResult) -> Option<RiskLevel> {
    let probability = result.individual_risk.incident_probability?;
    Some(RiskLevel::from_probability_pct(probability * 100.0))
}

/// Text block shown in the premium card.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PremiumDisplay {
    pub headline: String,
    pub amount: String,
    pub share_of_asset: Option<String>,
    pub coverage_note: Option<String>,
    pub rejection_reason: Option<String>,
}

pub fn premium_display(result: &QuoteResult, asset_value_millions: f64) -> PremiumDisplay {
    let pricing = &result.pricing_result;
    let amount = match result.payable_premium_usd() {
        Some(premium) => format_usd(premium),
        None => "N/A".to_string(),
    };
    let share_of_asset = premium_percentage(result, asset_value_millions)
        .map(|pct| format!("{pct:.3}% of asset value"));
    let coverage_note = pricing
        .coverage_percentage
        .filter(|coverage| *coverage < 100.0)
        .map(|coverage| format!("{coverage}% coverage"));

    PremiumDisplay {
        headline: pricing.policy_status.headline().to_string(),
        amount,
        share_of_asset,
        coverage_note,
        rejection_reason: pricing.rejection_reason.clone(),
    }
}

/// Formats a dollar amount with thousands separators, e.g. `$1,250,000`.
///
/// Amounts that cannot be shown to the cent (non-finite or past the `u64` cent
/// range) render as `N/A`.
pub fn format_usd(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round();
    if !cents.is_finite() || cents >= u64::MAX as f64 {
        return "N/A".to_string();
    }
    let cents = cents as u64;
    let (whole, fraction) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    if fraction == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{fraction:02}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::assessment::{
        classify_premium_affordability, classify_risk_level, format_usd, premium_display,
        PremiumAffordability, RiskLevel,
    };
    use crate::domain::quote::QuoteResult;

    fn approved(premium: f64) -> QuoteResult {
        serde_json::from_value(json!({
            "pricing_result": { "policy_status": "APPROVED", "final_premium_usd": premium }
        }))
        .expect("approved payload")
    }

    fn with_probability(probability: f64) -> QuoteResult {
        serde_json::from_value(json!({
            "pricing_result": { "policy_status": "APPROVED", "final_premium_usd": 1000 },
            "individual_risk": { "incident_probability": probability }
        }))
        .expect("risk payload")
    }

    #[test]
    fn normal_scenario_is_competitive() {
        let tier = classify_premium_affordability(&approved(50_000.0), 10.0);
        assert_eq!(tier, Some(PremiumAffordability::Competitive));
    }

    #[test]
    fn affordability_thresholds_are_strict() {
        // 10M asset: 200k is exactly 2%, 500k exactly 5%.
        assert_eq!(
            classify_premium_affordability(&approved(200_000.0), 10.0),
            Some(PremiumAffordability::Competitive)
        );
        assert_eq!(
            classify_premium_affordability(&approved(200_001.0), 10.0),
            Some(PremiumAffordability::Moderate)
        );
        assert_eq!(
            classify_premium_affordability(&approved(500_000.0), 10.0),
            Some(PremiumAffordability::Moderate)
        );
        assert_eq!(
            classify_premium_affordability(&approved(500_001.0), 10.0),
            Some(PremiumAffordability::High)
        );
    }

    #[test]
    fn affordability_is_monotonic_in_premium() {
        let mut previous = PremiumAffordability::Competitive;
        for step in 0..=80 {
            let premium = f64::from(step) * 10_000.0;
            let tier = classify_premium_affordability(&approved(premium), 10.0)
                .expect("approved premium is classified");
            assert!(tier >= previous, "tier dropped at premium {premium}");
            previous = tier;
        }
        assert_eq!(previous, PremiumAffordability::High);
    }

    #[test]
    fn risk_level_thresholds_are_strict() {
        assert_eq!(classify_risk_level(&with_probability(0.01)), Some(RiskLevel::Moderate));
        assert_eq!(classify_risk_level(&with_probability(0.005)), Some(RiskLevel::Low));
        assert_eq!(classify_risk_level(&with_probability(0.0101)), Some(RiskLevel::High));
        assert_eq!(classify_risk_level(&with_probability(0.006)), Some(RiskLevel::Moderate));
        assert_eq!(RiskLevel::High.label(), "High Risk");
    }

    #[test]
    fn missing_probability_is_not_classified() {
        assert_eq!(classify_risk_level(&approved(1.0)), None);
    }

    #[test]
    fn rejected_policy_shows_not_available_and_skips_affordability() {
        let result: QuoteResult = serde_json::from_value(json!({
            "pricing_result": {
                "policy_status": "REJECTED",
                "rejection_reason": "Premium would exceed 15% of asset value"
            }
        }))
        .expect("rejected payload");

        assert_eq!(classify_premium_affordability(&result, 10.0), None);

        let display = premium_display(&result, 10.0);
        assert_eq!(display.amount, "N/A");
        assert_eq!(display.headline, "Policy Rejected");
        assert_eq!(display.share_of_asset, None);
        assert_eq!(
            display.rejection_reason.as_deref(),
            Some("Premium would exceed 15% of asset value")
        );
    }

    #[test]
    fn modified_policy_notes_reduced_coverage() {
        let result: QuoteResult = serde_json::from_value(json!({
            "pricing_result": {
                "policy_status": "MODIFIED",
                "final_premium_usd": 1500000,
                "coverage_percentage": 71
            }
        }))
        .expect("modified payload");

        let display = premium_display(&result, 10.0);
        assert_eq!(display.amount, "$1,500,000");
        assert_eq!(display.share_of_asset.as_deref(), Some("15.000% of asset value"));
        assert_eq!(display.coverage_note.as_deref(), Some("71% coverage"));
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(50_000.0), "$50,000");
        assert_eq!(format_usd(999.0), "$999");
        assert_eq!(format_usd(1_234_567.5), "$1,234,567.50");
        assert_eq!(format_usd(0.0), "$0");
    }

    #[test]
    fn unrepresentable_amounts_are_not_available() {
        assert_eq!(format_usd(f64::NAN), "N/A");
        assert_eq!(format_usd(f64::INFINITY), "N/A");
        assert_eq!(format_usd(1e300), "N/A");

        let display = premium_display(&approved(f64::MAX), 10.0);
        assert_eq!(display.amount, "N/A");
    }
}
