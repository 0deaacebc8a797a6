use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    Approved,
    Modified,
    Rejected,
}

impl PolicyStatus {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Approved => "Policy Approved",
            Self::Modified => "Modified Coverage",
            Self::Rejected => "Policy Rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub policy_status: PolicyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_premium_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_premium_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge_applied: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductible_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_mitigation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_options: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndividualRisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_category: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAssessment {
    #[serde(default)]
    pub strategic_recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_exposure_millions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probable_maximum_loss_millions: Option<f64>,
}

/// Backend pricing payload. Only the fields the workflow interprets are typed;
/// anything else the backend sends is kept in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub pricing_result: PricingResult,
    #[serde(default)]
    pub individual_risk: IndividualRisk,
    #[serde(default)]
    pub portfolio_assessment: PortfolioAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_case_kp: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Business reading of a result. A rejection is a valid quote, not a failure.
#[derive(Clone, Debug, PartialEq)]
pub enum QuoteOutcome {
    Approved { premium_usd: Option<f64> },
    Modified { premium_usd: Option<f64>, coverage_percentage: Option<f64> },
    Rejected { reason: Option<String> },
}

impl QuoteResult {
    pub fn status(&self) -> PolicyStatus {
        self.pricing_result.policy_status
    }

    pub fn is_rejected(&self) -> bool {
        self.status() == PolicyStatus::Rejected
    }

    /// Premium the view may show; never present for a rejected policy.
    pub fn payable_premium_usd(&self) -> Option<f64> {
        if self.is_rejected() {
            return None;
        }
        self.pricing_result.final_premium_usd
    }

    pub fn outcome(&self) -> QuoteOutcome {
        let pricing = &self.pricing_result;
        match pricing.policy_status {
            PolicyStatus::Approved => QuoteOutcome::Approved { premium_usd: pricing.final_premium_usd },
            PolicyStatus::Modified => QuoteOutcome::Modified {
                premium_usd: pricing.final_premium_usd,
                coverage_percentage: pricing.coverage_percentage,
            },
            PolicyStatus::Rejected => {
                QuoteOutcome::Rejected { reason: pricing.rejection_reason.clone() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::quote::{PolicyStatus, QuoteOutcome, QuoteResult};

    #[test]
    fn minimal_approved_payload_deserializes_with_defaults() {
        let result: QuoteResult = serde_json::from_value(json!({
            "pricing_result": { "policy_status": "APPROVED", "final_premium_usd": 50000 }
        }))
        .expect("minimal payload");

        assert_eq!(result.status(), PolicyStatus::Approved);
        assert_eq!(result.payable_premium_usd(), Some(50_000.0));
        assert_eq!(result.individual_risk.incident_probability, None);
        assert!(result.portfolio_assessment.strategic_recommendation.is_empty());
    }

    #[test]
    fn rejected_payload_has_no_payable_premium() {
        let result: QuoteResult = serde_json::from_value(json!({
            "pricing_result": {
                "policy_status": "REJECTED",
                "final_premium_usd": 9000000,
                "rejection_reason": "premium exceeds economical limit"
            },
            "individual_risk": { "incident_probability": 0.2 },
            "portfolio_assessment": { "strategic_recommendation": "reduce exposure" }
        }))
        .expect("rejected payload");

        assert!(result.is_rejected());
        assert_eq!(result.payable_premium_usd(), None);
        assert_eq!(
            result.outcome(),
            QuoteOutcome::Rejected { reason: Some("premium exceeds economical limit".to_string()) }
        );
    }

    #[test]
    fn unknown_backend_fields_are_preserved() {
        let payload = json!({
            "pricing_result": {
                "policy_status": "MODIFIED",
                "final_premium_usd": 1500000,
                "coverage_percentage": 71
            },
            "worst_case_kp": 9.2,
            "agent_trace": ["data", "risk", "cro", "pricing"]
        });
        let result: QuoteResult = serde_json::from_value(payload).expect("modified payload");

        assert_eq!(result.worst_case_kp, Some(9.2));
        assert_eq!(result.extra["agent_trace"], json!(["data", "risk", "cro", "pricing"]));
        assert_eq!(
            result.outcome(),
            QuoteOutcome::Modified { premium_usd: Some(1_500_000.0), coverage_percentage: Some(71.0) }
        );

        let echoed = serde_json::to_value(&result).expect("serialize");
        assert_eq!(echoed["agent_trace"][3], "pricing");
    }

    #[test]
    fn unsupported_policy_status_is_a_decode_error() {
        let result = serde_json::from_value::<QuoteResult>(json!({
            "pricing_result": { "policy_status": "PENDING" }
        }));
        assert!(result.is_err());
    }
}
