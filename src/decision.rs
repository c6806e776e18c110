//! Loan decision engine
//!
//! Turns a PD, its risk rating and (after Phase 2) the consistency index into
//! an internal decision, the two-valued decision an applicant may see, and
//! loan terms. Terms depend only on the risk rating; the decision depends on
//! PD and consistency. The two are never derived from each other.

use crate::assessment::LoanRecommendation;
use crate::blending::ConsistencyIndex;
use crate::config::{ConsistencyConfig, RiskConfig};
use crate::error::ScoringError;
use crate::types::{Decision, RiskRating, UserFacingDecision};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Message shown to approved applicants
pub const APPROVED_MESSAGE: &str =
    "Congratulations! Your application has been approved. We will contact you with next steps.";

/// Message shown to every other applicant, including when scoring failed
pub const UNDER_REVIEW_MESSAGE: &str =
    "Thank you! Your application is under review. We will be in touch shortly.";

/// Loan terms offered for one risk tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub max_amount: f64,
    pub duration_months: u32,
    /// Annual percentage rate as a fraction (0.18 = 18%)
    pub apr: f64,
}

impl LoanTerms {
    const fn new(max_amount: f64, duration_months: u32, apr: f64) -> Self {
        Self {
            max_amount,
            duration_months,
            apr,
        }
    }
}

/// Terms keyed by risk rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanTermsTable {
    pub low: LoanTerms,
    pub moderate: LoanTerms,
    pub elevated: LoanTerms,
}

impl Default for LoanTermsTable {
    fn default() -> Self {
        Self {
            low: LoanTerms::new(25_000.0, 24, 0.12),
            moderate: LoanTerms::new(15_000.0, 18, 0.18),
            elevated: LoanTerms::new(7_500.0, 12, 0.26),
        }
    }
}

impl LoanTermsTable {
    pub fn for_rating(&self, rating: RiskRating) -> LoanTerms {
        match rating {
            RiskRating::Low => self.low,
            RiskRating::Moderate => self.moderate,
            RiskRating::Elevated => self.elevated,
        }
    }

    /// Terms must be positive and no tier may be more generous than a safer one
    pub fn validate(&self) -> Result<(), ScoringError> {
        let tiers = [
            (RiskRating::Low, self.low),
            (RiskRating::Moderate, self.moderate),
            (RiskRating::Elevated, self.elevated),
        ];
        for (rating, terms) in tiers {
            if !terms.max_amount.is_finite() || terms.max_amount <= 0.0 {
                return Err(ScoringError::InvalidConfig(format!(
                    "{} max_amount must be positive",
                    rating.as_str()
                )));
            }
            if terms.duration_months == 0 {
                return Err(ScoringError::InvalidConfig(format!(
                    "{} duration_months must be positive",
                    rating.as_str()
                )));
            }
            if !terms.apr.is_finite() || !(0.0..1.0).contains(&terms.apr) {
                return Err(ScoringError::InvalidConfig(format!(
                    "{} apr must lie in [0, 1)",
                    rating.as_str()
                )));
            }
        }

        for pair in tiers.windows(2) {
            let (safer_rating, safer) = pair[0];
            let (riskier_rating, riskier) = pair[1];
            if riskier.max_amount > safer.max_amount || riskier.apr < safer.apr {
                return Err(ScoringError::InvalidConfig(format!(
                    "{} terms are more generous than {} terms",
                    riskier_rating.as_str(),
                    safer_rating.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// Which rule produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Self-report and behavior disagree beyond the review threshold
    ConsistencyReview,
    LowRisk,
    ModerateRisk,
    ElevatedRisk,
}

/// Output of [`LoanDecisionEngine::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub user_facing: UserFacingDecision,
    pub reason: DecisionReason,
}

/// Decision rules bound to the configured thresholds
pub struct LoanDecisionEngine<'a> {
    risk: &'a RiskConfig,
    consistency: &'a ConsistencyConfig,
    terms: &'a LoanTermsTable,
}

impl<'a> LoanDecisionEngine<'a> {
    pub fn new(
        risk: &'a RiskConfig,
        consistency: &'a ConsistencyConfig,
        terms: &'a LoanTermsTable,
    ) -> Self {
        Self {
            risk,
            consistency,
            terms,
        }
    }

    /// Decide on a PD, with the consistency rule checked first.
    ///
    /// `consistency` is `None` for a Phase-1-only decision.
    pub fn decide(&self, pd: f64, consistency: Option<&ConsistencyIndex>) -> DecisionOutcome {
        let (decision, reason) = match consistency {
            Some(index) if index.requires_review(self.consistency) => {
                warn!(
                    overall = index.overall,
                    flag = ?index.flag,
                    "consistency discrepancy forces manual review"
                );
                (Decision::ManualReview, DecisionReason::ConsistencyReview)
            }
            _ if pd < self.risk.low_below => (Decision::Approved, DecisionReason::LowRisk),
            _ if pd < self.risk.moderate_below => {
                (Decision::PendingApproval, DecisionReason::ModerateRisk)
            }
            _ => (Decision::ManualReview, DecisionReason::ElevatedRisk),
        };

        info!(decision = ?decision, reason = ?reason, "loan decision computed");

        DecisionOutcome {
            decision,
            user_facing: decision.user_facing(),
            reason,
        }
    }

    /// Loan terms for a risk rating, with a plain-language basis for each figure
    pub fn recommend(&self, rating: RiskRating, pd: f64) -> LoanRecommendation {
        let terms = self.terms.for_rating(rating);
        let tier = rating.as_str();

        LoanRecommendation {
            max_amount: terms.max_amount,
            duration_months: terms.duration_months,
            apr: terms.apr,
            amount_basis: format!(
                "Maximum of {:.0} for the {tier} risk tier (estimated PD {:.1}%)",
                terms.max_amount,
                pd * 100.0
            ),
            duration_basis: format!(
                "{} month term standard for the {tier} risk tier",
                terms.duration_months
            ),
            apr_basis: format!("{:.1}% APR priced for the {tier} risk tier", terms.apr * 100.0),
            admin_justification: None,
            reviewed_by: None,
            reviewed_at: None,
            is_overridden: false,
        }
    }
}

/// The only payload an applicant ever receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantResponse {
    pub decision: UserFacingDecision,
    pub message: String,
    pub profile_name: Option<String>,
}

impl ApplicantResponse {
    pub fn new(decision: UserFacingDecision, profile_name: Option<String>) -> Self {
        let message = match decision {
            UserFacingDecision::Approved => APPROVED_MESSAGE,
            UserFacingDecision::PendingApproval => UNDER_REVIEW_MESSAGE,
        };
        Self {
            decision,
            message: message.to_string(),
            profile_name,
        }
    }

    /// Generic response used whenever scoring could not complete
    pub fn under_review() -> Self {
        Self::new(UserFacingDecision::PendingApproval, None)
    }
}
