//! Scoring pipeline orchestration
//!
//! [`ScoringContext`] binds a validated [`ScoringConfig`] to every scoring
//! stage. The free functions at the bottom are the stateless, one-shot JSON
//! entry points used by the FFI layer and the CLI.

use crate::assessment::{Assessment, LoanRecommendation};
use crate::behavior::{
    parse_bundle, validate_bundle, BehaviorExtractor, BehavioralScores, BehavioralSignalBundle,
};
use crate::blending::{blend, consistency_index};
use crate::config::ScoringConfig;
use crate::decision::{ApplicantResponse, LoanDecisionEngine};
use crate::encoder::{ReportEncoder, ReportInput};
use crate::error::ScoringError;
use crate::profiles::ProfileMatcher;
use crate::questionnaire::{
    parse_responses, validate_history, QuestionPolicy, QuestionResponse, TraitAggregator,
};
use crate::risk::{PdBreakdown, RiskModel};
use crate::session::SessionStatus;
use crate::types::TraitVector;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Risk and profile result for one trait vector
#[derive(Debug, Clone, PartialEq)]
pub struct TraitScore {
    pub breakdown: PdBreakdown,
    pub profile_name: Option<String>,
    pub profile_display_name: Option<String>,
    pub profile_modifier: f64,
    pub profile_confidence: f64,
}

/// Result of scoring the behavioral phase on top of a Phase-1 assessment
#[derive(Debug, Clone, PartialEq)]
pub struct Phase2Result {
    pub assessment: Assessment,
    pub recommendation: LoanRecommendation,
    pub behavioral: BehavioralScores,
}

/// Immutable scoring context. The only way to run the pipeline.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    config: ScoringConfig,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }
}

impl ScoringContext {
    /// Validate `config` and bind it
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Build a context from an optional JSON config; `None` uses defaults
    pub fn from_json(config_json: Option<&str>) -> Result<Self, ScoringError> {
        match config_json {
            Some(json) => Self::new(ScoringConfig::from_json(json)?),
            None => Ok(Self::default()),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn risk_model(&self) -> RiskModel<'_> {
        RiskModel::new(&self.config.risk)
    }

    pub fn profile_matcher(&self) -> ProfileMatcher<'_> {
        ProfileMatcher::new(&self.config.profiles)
    }

    pub fn decision_engine(&self) -> LoanDecisionEngine<'_> {
        LoanDecisionEngine::new(
            &self.config.risk,
            &self.config.consistency,
            &self.config.loan_terms,
        )
    }

    pub fn question_policy(&self) -> QuestionPolicy<'_> {
        QuestionPolicy::new(&self.config.questionnaire)
    }

    /// Match a profile and compute the modified PD for a trait vector
    pub fn score_traits(&self, traits: &TraitVector) -> TraitScore {
        let matcher = self.profile_matcher();
        let matched = matcher.match_profile(traits);
        let modifier = matched.as_ref().map_or(0.0, |m| m.profile.pd_modifier);
        let breakdown = self.risk_model().calculate_full_pd(traits, modifier);

        TraitScore {
            breakdown,
            profile_name: matched.as_ref().map(|m| m.profile.name.clone()),
            profile_display_name: matcher.blended_name(traits),
            profile_modifier: modifier,
            profile_confidence: matched.as_ref().map_or(0.0, |m| m.confidence),
        }
    }

    /// Fail with [`ScoringError::PreconditionViolation`] unless the
    /// history satisfies the question policy's stopping rule
    pub fn require_complete_history(
        &self,
        responses: &[QuestionResponse],
    ) -> Result<(), ScoringError> {
        let variances = TraitAggregator::variances(responses);
        if self.question_policy().is_complete(&variances, responses.len()) {
            Ok(())
        } else {
            Err(ScoringError::PreconditionViolation(format!(
                "stopping rule not met after {} responses",
                responses.len()
            )))
        }
    }

    /// Score the self-report phase.
    ///
    /// The history must be non-empty, belong to one session and be in
    /// answer order.
    pub fn score_phase1(
        &self,
        responses: &[QuestionResponse],
        now: DateTime<Utc>,
    ) -> Result<(Assessment, LoanRecommendation), ScoringError> {
        validate_history(responses)?;
        let first = responses.first().ok_or_else(|| {
            ScoringError::InvalidInput("at least one response is required for Phase 1".to_string())
        })?;

        let traits = TraitAggregator::averages(responses);
        let score = self.score_traits(&traits);
        let pd = score.breakdown.pd;
        let rating = score.breakdown.rating;

        let engine = self.decision_engine();
        let outcome = engine.decide(pd, None);
        let recommendation = engine.recommend(rating, pd);

        info!(
            session_id = %first.session_id,
            responses = responses.len(),
            decision = ?outcome.decision,
            "phase 1 scored"
        );

        let assessment = Assessment {
            session_id: first.session_id.clone(),
            phase1_traits: traits,
            phase1_pd: pd,
            blended_traits: None,
            consistency: None,
            final_pd: pd,
            risk_rating: rating,
            breakdown: score.breakdown,
            profile_name: score.profile_name,
            profile_display_name: score.profile_display_name,
            profile_modifier: score.profile_modifier,
            profile_confidence: score.profile_confidence,
            decision: outcome.decision,
            user_facing_decision: outcome.user_facing,
            created_at: now,
            updated_at: now,
        };
        Ok((assessment, recommendation))
    }

    /// Score the behavioral phase against a stored Phase-1 assessment.
    ///
    /// Fails with [`ScoringError::PreconditionViolation`] when no Phase-1
    /// result exists and with [`ScoringError::InvalidBundle`] when the
    /// bundle carries non-finite or out-of-range values.
    pub fn score_phase2(
        &self,
        phase1: Option<&Assessment>,
        bundle: &BehavioralSignalBundle,
        now: DateTime<Utc>,
    ) -> Result<Phase2Result, ScoringError> {
        let phase1 = phase1.ok_or_else(|| {
            ScoringError::PreconditionViolation(
                "blending requires a Phase-1 assessment for the session".to_string(),
            )
        })?;
        validate_bundle(bundle)?;

        let behavioral = BehaviorExtractor::extract(bundle, &self.config.behavior);
        let blended = blend(&phase1.phase1_traits, &behavioral.traits, &self.config.blend);
        let consistency = consistency_index(
            &phase1.phase1_traits,
            &behavioral.traits,
            &self.config.risk.weights,
            &self.config.consistency,
        );

        let score = self.score_traits(&blended);
        let pd = score.breakdown.pd;
        let rating = score.breakdown.rating;

        let engine = self.decision_engine();
        let outcome = engine.decide(pd, Some(&consistency));
        let recommendation = engine.recommend(rating, pd);

        if !behavioral.quality_flags.is_empty() {
            warn!(
                session_id = %phase1.session_id,
                flags = ?behavioral.quality_flags,
                "behavioral bundle relied on fallback values"
            );
        }
        info!(
            session_id = %phase1.session_id,
            decision = ?outcome.decision,
            flag = ?consistency.flag,
            "phase 2 scored"
        );

        let mut assessment = phase1.clone();
        assessment.blended_traits = Some(blended);
        assessment.consistency = Some(consistency);
        assessment.final_pd = pd;
        assessment.risk_rating = rating;
        assessment.breakdown = score.breakdown;
        assessment.profile_name = score.profile_name;
        assessment.profile_display_name = score.profile_display_name;
        assessment.profile_modifier = score.profile_modifier;
        assessment.profile_confidence = score.profile_confidence;
        assessment.decision = outcome.decision;
        assessment.user_facing_decision = outcome.user_facing;
        assessment.updated_at = now;

        Ok(Phase2Result {
            assessment,
            recommendation,
            behavioral,
        })
    }
}

/// Score a self-report history (stateless, one-shot) and return the admin report JSON.
///
/// # Arguments
/// * `responses_json` - JSON array of question responses in answer order
/// * `config_json` - optional scoring configuration; defaults when `None`
pub fn score_phase1_json(
    responses_json: &str,
    config_json: Option<&str>,
) -> Result<String, ScoringError> {
    let context = ScoringContext::from_json(config_json)?;
    let responses = parse_responses(responses_json)?;
    context.require_complete_history(&responses)?;
    let (assessment, recommendation) = context.score_phase1(&responses, Utc::now())?;

    ReportEncoder::new().encode_to_json(&ReportInput {
        status: SessionStatus::Phase1Complete,
        assessment: &assessment,
        recommendation: &recommendation,
        behavioral: None,
        bundle: None,
    })
}

/// Score both phases (stateless, one-shot) and return the admin report JSON
pub fn score_full_json(
    responses_json: &str,
    bundle_json: &str,
    config_json: Option<&str>,
) -> Result<String, ScoringError> {
    let context = ScoringContext::from_json(config_json)?;
    let responses = parse_responses(responses_json)?;
    context.require_complete_history(&responses)?;
    let bundle = parse_bundle(bundle_json)?;

    let now = Utc::now();
    let (phase1, _) = context.score_phase1(&responses, now)?;
    let result = context.score_phase2(Some(&phase1), &bundle, now)?;

    ReportEncoder::new().encode_to_json(&ReportInput {
        status: SessionStatus::Phase2Complete,
        assessment: &result.assessment,
        recommendation: &result.recommendation,
        behavioral: Some(&result.behavioral),
        bundle: Some(&bundle),
    })
}

/// Applicant-facing JSON for a history and optional bundle.
///
/// Scoring failures never reach the applicant: they collapse into the
/// generic under-review response.
pub fn applicant_response_json(
    responses_json: &str,
    bundle_json: Option<&str>,
    config_json: Option<&str>,
) -> Result<String, ScoringError> {
    let response = match applicant_response(responses_json, bundle_json, config_json) {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "scoring failed, answering under review");
            ApplicantResponse::under_review()
        }
    };
    serde_json::to_string(&response).map_err(ScoringError::JsonError)
}

fn applicant_response(
    responses_json: &str,
    bundle_json: Option<&str>,
    config_json: Option<&str>,
) -> Result<ApplicantResponse, ScoringError> {
    let context = ScoringContext::from_json(config_json)?;
    let responses = parse_responses(responses_json)?;
    context.require_complete_history(&responses)?;
    let now = Utc::now();
    let (phase1, _) = context.score_phase1(&responses, now)?;

    let assessment = match bundle_json {
        Some(json) => {
            let bundle = parse_bundle(json)?;
            context.score_phase2(Some(&phase1), &bundle, now)?.assessment
        }
        None => phase1,
    };
    Ok(assessment.applicant_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blending::ConsistencyFlag;
    use crate::types::{Decision, OceanTrait, UserFacingDecision};
    use chrono::TimeZone;

    fn make_test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
    }

    /// Twelve answers describing a careful, calm applicant
    fn sample_responses_json() -> String {
        let answers = [
            ("conscientiousness", 5.0),
            ("neuroticism", 1.0),
            ("agreeableness", 3.0),
            ("openness", 3.0),
            ("extraversion", 3.0),
            ("conscientiousness", 5.0),
            ("neuroticism", 1.0),
            ("agreeableness", 3.0),
            ("openness", 3.0),
            ("extraversion", 3.0),
            ("conscientiousness", 5.0),
            ("neuroticism", 1.0),
        ];
        let items: Vec<String> = answers
            .iter()
            .enumerate()
            .map(|(i, (t, score))| {
                format!(
                    r#"{{ "session_id": "sess-7", "sequence_index": {i}, "question_type": "slider",
                          "trait": "{t}", "score": {score:.1}, "latency_ms": 2400 }}"#
                )
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    fn sample_bundle_json() -> &'static str {
        r#"{
            "session_id": "game-7",
            "tap_intervals_ms": [520.0, 610.0, 580.0, 560.0],
            "path_records": [
                { "actual_distance": 10.0, "optimal_distance": 10.0 },
                { "actual_distance": 11.0, "optimal_distance": 10.0 }
            ],
            "banking_events": [
                { "amount": 10.0, "timestamp_ms": 10000.0 },
                { "amount": 10.0, "timestamp_ms": 20000.0 },
                { "amount": 10.0, "timestamp_ms": 30000.0 }
            ],
            "cargo_loads": [ { "crate_count": 3 }, { "crate_count": 3 } ],
            "loss_events": [ { "loss_type": "theft", "behavior_delta": 0.1 } ],
            "sharing_events": [ { "accepted": true, "reward_split": 0.5 } ],
            "help_events": [ { "accepted": true } ],
            "unique_tiles_visited": 20,
            "total_tiles": 40,
            "crowd_time_ms": 25000.0,
            "quiet_time_ms": 25000.0,
            "concurrency_samples": [1, 2, 1, 2]
        }"#
    }

    #[test]
    fn test_context_rejects_invalid_config() {
        let mut config = ScoringConfig::default();
        config.risk.weights.conscientiousness = 0.9;
        assert!(matches!(
            ScoringContext::new(config),
            Err(ScoringError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_phase1_scoring() {
        let context = ScoringContext::default();
        let responses = parse_responses(&sample_responses_json()).unwrap();
        let (assessment, recommendation) =
            context.score_phase1(&responses, make_test_time()).unwrap();

        assert_eq!(assessment.session_id, "sess-7");
        assert_eq!(assessment.phase1_traits, TraitVector::new(3.0, 5.0, 3.0, 3.0, 1.0));
        assert!(assessment.blended_traits.is_none());
        assert!(assessment.consistency.is_none());
        assert_eq!(assessment.created_at, make_test_time());

        // Raw PD 0.086 before the profile modifier
        assert!((assessment.breakdown.raw_pd - 0.086).abs() < 1e-9);
        let expected_pd = (0.086 + assessment.profile_modifier).clamp(0.02, 0.35);
        assert!((assessment.phase1_pd - expected_pd).abs() < 1e-9);
        assert_eq!(assessment.final_pd, assessment.phase1_pd);
        assert!(assessment.profile_name.is_some());
        assert_eq!(
            recommendation.max_amount,
            context.config().loan_terms.for_rating(assessment.risk_rating).max_amount
        );
    }

    #[test]
    fn test_phase1_requires_responses() {
        let context = ScoringContext::default();
        assert!(matches!(
            context.score_phase1(&[], make_test_time()),
            Err(ScoringError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_phase2_without_phase1_fails_loudly() {
        let context = ScoringContext::default();
        let bundle = parse_bundle(sample_bundle_json()).unwrap();
        assert!(matches!(
            context.score_phase2(None, &bundle, make_test_time()),
            Err(ScoringError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_phase2_blends_and_keeps_phase1() {
        let context = ScoringContext::default();
        let responses = parse_responses(&sample_responses_json()).unwrap();
        let (phase1, _) = context.score_phase1(&responses, make_test_time()).unwrap();
        let bundle = parse_bundle(sample_bundle_json()).unwrap();

        let later = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let result = context.score_phase2(Some(&phase1), &bundle, later).unwrap();
        let assessment = &result.assessment;

        assert_eq!(assessment.phase1_traits, phase1.phase1_traits);
        assert_eq!(assessment.phase1_pd, phase1.phase1_pd);
        assert_eq!(assessment.created_at, make_test_time());
        assert_eq!(assessment.updated_at, later);

        let blended = assessment.blended_traits.unwrap();
        let expected = blend(
            &phase1.phase1_traits,
            &result.behavioral.traits,
            &context.config().blend,
        );
        for t in OceanTrait::ALL {
            assert!((blended.get(t) - expected.get(t)).abs() < 1e-12);
        }
        assert!(assessment.consistency.is_some());
        assert!((assessment.final_pd - assessment.breakdown.pd).abs() < 1e-12);
    }

    #[test]
    fn test_gaming_signal_forces_review() {
        // Claims to be a model borrower while the game shows the opposite
        let context = ScoringContext::default();
        let responses = parse_responses(&sample_responses_json()).unwrap();
        let (phase1, _) = context.score_phase1(&responses, make_test_time()).unwrap();

        let mut bundle = BehavioralSignalBundle::empty("game-x");
        bundle.path_records = vec![crate::behavior::PathRecord {
            delivery_id: None,
            actual_distance: 40.0,
            optimal_distance: 10.0,
        }];
        bundle.tap_intervals_ms = vec![50.0, 60.0, 2_000.0, 40.0];
        bundle.loss_events = vec![crate::behavior::LossEvent {
            loss_type: crate::behavior::LossType::Theft,
            timestamp_ms: 1_000.0,
            amount_lost: 10.0,
            behavior_delta: 1.0,
        }];
        bundle.cargo_loads = vec![crate::behavior::CargoLoad {
            crate_count: 1,
            tipped: false,
            reward: 5.0,
            delivery_id: None,
        }];

        let result = context.score_phase2(Some(&phase1), &bundle, make_test_time()).unwrap();
        let consistency = result.assessment.consistency.as_ref().unwrap();
        assert!(consistency.overall > 0.40);
        assert!(consistency.flag >= ConsistencyFlag::ModerateDiscrepancy);
        assert_eq!(result.assessment.decision, Decision::ManualReview);
        assert_eq!(
            result.assessment.user_facing_decision,
            UserFacingDecision::PendingApproval
        );
    }

    #[test]
    fn test_score_json_entry_points() {
        let report = score_phase1_json(&sample_responses_json(), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["status"], "phase1_complete");
        assert_eq!(value["session_id"], "sess-7");
        assert!(value["assessment"]["blended_traits"].is_null());

        let full = score_full_json(&sample_responses_json(), sample_bundle_json(), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&full).unwrap();
        assert_eq!(value["status"], "phase2_complete");
        assert!(value["behavioral_scores"]["risk_index"].is_number());
        assert_eq!(value["signal_bundle"]["session_id"], "game-7");
    }

    #[test]
    fn test_json_entry_points_enforce_stopping_rule() {
        let single = r#"[ { "session_id": "sess-1", "sequence_index": 0, "question_type": "slider",
                            "trait": "conscientiousness", "score": 5.0, "latency_ms": 2400 } ]"#;
        assert!(matches!(
            score_phase1_json(single, None),
            Err(ScoringError::PreconditionViolation(_))
        ));
        assert!(matches!(
            score_full_json(single, sample_bundle_json(), None),
            Err(ScoringError::PreconditionViolation(_))
        ));

        let json = applicant_response_json(single, Some(sample_bundle_json()), None).unwrap();
        let response: ApplicantResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response, ApplicantResponse::under_review());

        let context = ScoringContext::default();
        let responses = parse_responses(&sample_responses_json()).unwrap();
        assert!(context.require_complete_history(&responses).is_ok());
        assert!(context.require_complete_history(&responses[..1]).is_err());
    }

    #[test]
    fn test_phase2_rejects_invalid_bundle() {
        let context = ScoringContext::default();
        let responses = parse_responses(&sample_responses_json()).unwrap();
        let (phase1, _) = context.score_phase1(&responses, make_test_time()).unwrap();

        let mut bundle = BehavioralSignalBundle::empty("game-bad");
        bundle.tap_intervals_ms = vec![500.0, f64::INFINITY];
        assert!(matches!(
            context.score_phase2(Some(&phase1), &bundle, make_test_time()),
            Err(ScoringError::InvalidBundle(_))
        ));
    }

    #[test]
    fn test_applicant_json_collapses_errors() {
        let json = applicant_response_json("not json", None, None).unwrap();
        let response: ApplicantResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response, ApplicantResponse::under_review());

        let json =
            applicant_response_json(&sample_responses_json(), None, Some("{ bad")).unwrap();
        let response: ApplicantResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response.decision, UserFacingDecision::PendingApproval);
    }

    #[test]
    fn test_applicant_json_never_leaks_pd() {
        let json = applicant_response_json(
            &sample_responses_json(),
            Some(sample_bundle_json()),
            None,
        )
        .unwrap();
        assert!(!json.contains("pd"));
        assert!(!json.contains("manual_review"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 3);
    }
}
