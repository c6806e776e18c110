//! Assessment and loan recommendation records
//!
//! These are the plain records handed to the persistence layer and the admin
//! view. An [`AdminOverride`] is the privileged write path; once applied, the
//! overridden decision and terms are final.

use crate::blending::ConsistencyIndex;
use crate::decision::ApplicantResponse;
use crate::error::ScoringError;
use crate::risk::PdBreakdown;
use crate::types::{Decision, RiskRating, TraitVector, UserFacingDecision};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Scoring result for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub session_id: String,
    /// Self-report averages (raw scale)
    pub phase1_traits: TraitVector,
    /// PD from self-report alone, after the profile modifier
    pub phase1_pd: f64,
    /// Blended scores (raw scale), set once Phase 2 completes
    pub blended_traits: Option<TraitVector>,
    pub consistency: Option<ConsistencyIndex>,
    /// PD of the most recent scoring pass
    pub final_pd: f64,
    pub risk_rating: RiskRating,
    pub breakdown: PdBreakdown,
    pub profile_name: Option<String>,
    /// Hybrid name when two profiles are close; display only
    pub profile_display_name: Option<String>,
    pub profile_modifier: f64,
    pub profile_confidence: f64,
    pub decision: Decision,
    pub user_facing_decision: UserFacingDecision,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assessment {
    /// Traits used for the current PD: blended when available, else Phase 1
    pub fn scored_traits(&self) -> &TraitVector {
        self.blended_traits.as_ref().unwrap_or(&self.phase1_traits)
    }

    pub fn has_phase2(&self) -> bool {
        self.blended_traits.is_some()
    }

    /// The applicant-facing view of this assessment
    pub fn applicant_response(&self) -> ApplicantResponse {
        ApplicantResponse::new(
            self.user_facing_decision,
            self.profile_display_name
                .clone()
                .or_else(|| self.profile_name.clone()),
        )
    }
}

/// Recommended loan terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecommendation {
    pub max_amount: f64,
    pub duration_months: u32,
    pub apr: f64,
    pub amount_basis: String,
    pub duration_basis: String,
    pub apr_basis: String,
    #[serde(default)]
    pub admin_justification: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_overridden: bool,
}

/// Manual decision entered by an administrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminOverride {
    pub decision: Decision,
    #[serde(default)]
    pub max_amount: Option<f64>,
    #[serde(default)]
    pub duration_months: Option<u32>,
    #[serde(default)]
    pub apr: Option<f64>,
    pub justification: String,
    pub reviewer: String,
}

impl AdminOverride {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.justification.trim().is_empty() {
            return Err(ScoringError::InvalidInput(
                "override justification must not be empty".to_string(),
            ));
        }
        if self.reviewer.trim().is_empty() {
            return Err(ScoringError::InvalidInput(
                "override reviewer must not be empty".to_string(),
            ));
        }
        if let Some(amount) = self.max_amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(ScoringError::InvalidInput(format!(
                    "override max_amount {amount} must be non-negative"
                )));
            }
        }
        if let Some(apr) = self.apr {
            if !apr.is_finite() || !(0.0..1.0).contains(&apr) {
                return Err(ScoringError::InvalidInput(format!(
                    "override apr {apr} must lie in [0, 1)"
                )));
            }
        }
        Ok(())
    }

    /// Write the override into both records
    pub fn apply(
        &self,
        assessment: &mut Assessment,
        recommendation: &mut LoanRecommendation,
        at: DateTime<Utc>,
    ) -> Result<(), ScoringError> {
        self.validate()?;

        warn!(
            session_id = %assessment.session_id,
            from = ?assessment.decision,
            to = ?self.decision,
            reviewer = %self.reviewer,
            "admin override applied"
        );

        assessment.decision = self.decision;
        assessment.user_facing_decision = self.decision.user_facing();
        assessment.updated_at = at;

        if let Some(amount) = self.max_amount {
            recommendation.max_amount = amount;
        }
        if let Some(months) = self.duration_months {
            recommendation.duration_months = months;
        }
        if let Some(apr) = self.apr {
            recommendation.apr = apr;
        }
        recommendation.admin_justification = Some(self.justification.clone());
        recommendation.reviewed_by = Some(self.reviewer.clone());
        recommendation.reviewed_at = Some(at);
        recommendation.is_overridden = true;
        Ok(())
    }
}
