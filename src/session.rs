//! Assessment session state machine
//!
//! ```text
//! InProgress ──phase1──▶ Phase1Complete ──phase2──▶ Phase2Complete ──finalize──▶ Completed
//!                              │                          │                       ▲
//!                              └──────apply_override──────┴───────────────────────┘
//! ```
//!
//! Answers are only accepted while `InProgress`, strictly in order. Once an
//! administrator override is applied the session is `Completed` and the
//! overridden records are final.

use crate::assessment::{AdminOverride, Assessment, LoanRecommendation};
use crate::behavior::{BehavioralScores, BehavioralSignalBundle};
use crate::encoder::ReportInput;
use crate::error::ScoringError;
use crate::pipeline::ScoringContext;
use crate::questionnaire::{
    build_response, validate_candidate_batch, AnswerSubmission, CandidateQuestion,
    QuestionResponse, QuestionType, TraitAggregator,
};
use crate::types::{TraitVector, VarianceMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Lifecycle of an assessment session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Phase1Complete,
    Phase2Complete,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Phase1Complete => "phase1_complete",
            SessionStatus::Phase2Complete => "phase2_complete",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applicant's assessment, from the first answer to the final decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSession {
    session_id: String,
    status: SessionStatus,
    responses: Vec<QuestionResponse>,
    assessment: Option<Assessment>,
    recommendation: Option<LoanRecommendation>,
    behavioral: Option<BehavioralScores>,
    bundle: Option<BehavioralSignalBundle>,
    overridden: bool,
}

impl AssessmentSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            status: SessionStatus::InProgress,
            responses: Vec::new(),
            assessment: None,
            recommendation: None,
            behavioral: None,
            bundle: None,
            overridden: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn responses(&self) -> &[QuestionResponse] {
        &self.responses
    }

    pub fn assessment(&self) -> Option<&Assessment> {
        self.assessment.as_ref()
    }

    pub fn recommendation(&self) -> Option<&LoanRecommendation> {
        self.recommendation.as_ref()
    }

    pub fn behavioral_scores(&self) -> Option<&BehavioralScores> {
        self.behavioral.as_ref()
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    /// Current trait averages, derived from the full history
    pub fn averages(&self) -> TraitVector {
        TraitAggregator::averages(&self.responses)
    }

    /// Current trait variances, derived from the full history
    pub fn variances(&self) -> VarianceMap {
        TraitAggregator::variances(&self.responses)
    }

    /// Question types of the recent answers used for the diversity bonus
    pub fn recent_types(&self, context: &ScoringContext) -> Vec<QuestionType> {
        let history: Vec<QuestionType> = self.responses.iter().map(|r| r.question_type).collect();
        context.question_policy().recent_types(&history).to_vec()
    }

    /// Pick the next question from a generator batch
    pub fn next_question(
        &self,
        context: &ScoringContext,
        candidates: &[CandidateQuestion],
    ) -> Result<usize, ScoringError> {
        self.require(SessionStatus::InProgress, SessionStatus::InProgress)?;
        validate_candidate_batch(candidates, &context.config().questionnaire)?;
        context.question_policy().select_optimal_question(
            candidates,
            &self.variances(),
            &self.recent_types(context),
        )
    }

    /// Whether the stopping rule is met for the current history
    pub fn is_complete(&self, context: &ScoringContext) -> bool {
        context
            .question_policy()
            .is_complete(&self.variances(), self.responses.len())
    }

    /// Adjust an answer for reaction time and record it as the next response
    pub fn record_answer(
        &mut self,
        context: &ScoringContext,
        submission: &AnswerSubmission,
    ) -> Result<&QuestionResponse, ScoringError> {
        self.require(SessionStatus::InProgress, SessionStatus::InProgress)?;
        let response = build_response(
            submission,
            &self.session_id,
            self.responses.len(),
            &context.config().reaction,
        )?;
        self.record_response(response)?;
        self.responses
            .last()
            .ok_or_else(|| ScoringError::InvalidInput("response was not recorded".to_string()))
    }

    /// Append an already-scored response; it must be the next one in order
    pub fn record_response(&mut self, response: QuestionResponse) -> Result<(), ScoringError> {
        self.require(SessionStatus::InProgress, SessionStatus::InProgress)?;
        response.validate()?;
        if response.session_id != self.session_id {
            return Err(ScoringError::SessionMismatch {
                expected: self.session_id.clone(),
                actual: response.session_id,
            });
        }
        if response.sequence_index != self.responses.len() {
            return Err(ScoringError::OutOfOrderResponse {
                expected: self.responses.len(),
                actual: response.sequence_index,
            });
        }

        debug!(
            session_id = %self.session_id,
            index = response.sequence_index,
            trait_name = response.target_trait.as_str(),
            "recorded response"
        );
        self.responses.push(response);
        Ok(())
    }

    /// Close self-report collection and score Phase 1
    pub fn complete_phase1(
        &mut self,
        context: &ScoringContext,
        now: DateTime<Utc>,
    ) -> Result<&Assessment, ScoringError> {
        self.require(SessionStatus::InProgress, SessionStatus::Phase1Complete)?;
        if self.responses.is_empty() {
            return Err(ScoringError::InvalidInput(
                "cannot complete Phase 1 without responses".to_string(),
            ));
        }
        context.require_complete_history(&self.responses)?;

        let (assessment, recommendation) = context.score_phase1(&self.responses, now)?;
        self.recommendation = Some(recommendation);
        self.transition(SessionStatus::Phase1Complete);
        Ok(self.assessment.insert(assessment))
    }

    /// Score the behavioral phase and blend it with Phase 1
    pub fn complete_phase2(
        &mut self,
        context: &ScoringContext,
        bundle: BehavioralSignalBundle,
        now: DateTime<Utc>,
    ) -> Result<&Assessment, ScoringError> {
        self.require(SessionStatus::Phase1Complete, SessionStatus::Phase2Complete)?;
        let result = context.score_phase2(self.assessment.as_ref(), &bundle, now)?;

        self.recommendation = Some(result.recommendation);
        self.behavioral = Some(result.behavioral);
        self.bundle = Some(bundle);
        self.transition(SessionStatus::Phase2Complete);
        Ok(self.assessment.insert(result.assessment))
    }

    /// Mark a fully scored session as final
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Result<(), ScoringError> {
        self.require(SessionStatus::Phase2Complete, SessionStatus::Completed)?;
        if let Some(assessment) = self.assessment.as_mut() {
            assessment.updated_at = now;
        }
        self.transition(SessionStatus::Completed);
        Ok(())
    }

    /// Apply an administrator override; the session becomes final
    pub fn apply_override(
        &mut self,
        admin_override: &AdminOverride,
        now: DateTime<Utc>,
    ) -> Result<(), ScoringError> {
        if self.status == SessionStatus::InProgress {
            return Err(self.invalid_transition(SessionStatus::Completed));
        }
        let (Some(assessment), Some(recommendation)) =
            (self.assessment.as_mut(), self.recommendation.as_mut())
        else {
            return Err(ScoringError::PreconditionViolation(
                "override requires a scored assessment".to_string(),
            ));
        };

        admin_override.apply(assessment, recommendation, now)?;
        self.overridden = true;
        self.transition(SessionStatus::Completed);
        Ok(())
    }

    /// Borrowed view for the report encoder; `None` before Phase 1 completes
    pub fn report_input(&self) -> Option<ReportInput<'_>> {
        Some(ReportInput {
            status: self.status,
            assessment: self.assessment.as_ref()?,
            recommendation: self.recommendation.as_ref()?,
            behavioral: self.behavioral.as_ref(),
            bundle: self.bundle.as_ref(),
        })
    }

    fn require(&self, expected: SessionStatus, to: SessionStatus) -> Result<(), ScoringError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.invalid_transition(to))
        }
    }

    fn invalid_transition(&self, to: SessionStatus) -> ScoringError {
        ScoringError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    fn transition(&mut self, to: SessionStatus) {
        info!(
            session_id = %self.session_id,
            from = %self.status,
            to = %to,
            "session transition"
        );
        self.status = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::AnswerOption;
    use crate::types::{Decision, OceanTrait, UserFacingDecision};
    use chrono::TimeZone;

    fn make_test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    fn make_test_candidate(t: OceanTrait, question_type: QuestionType) -> CandidateQuestion {
        CandidateQuestion {
            id: None,
            target_trait: t,
            question_type,
            prompt: "How do you handle a slow month?".to_string(),
            options: vec![
                AnswerOption {
                    label: "Dip into savings".to_string(),
                    score: 4.0,
                    target_trait: None,
                },
                AnswerOption {
                    label: "Borrow from family".to_string(),
                    score: 2.0,
                    target_trait: None,
                },
            ],
            display: serde_json::Map::new(),
        }
    }

    fn make_test_submission(t: OceanTrait) -> AnswerSubmission {
        AnswerSubmission {
            question: make_test_candidate(t, QuestionType::Slider),
            selected_option: 0,
            latency_ms: 3_000,
            hesitation_count: 0,
            changed_answer: false,
            payload: serde_json::Value::Null,
        }
    }

    /// Two identical answers per trait: every variance drops to zero
    fn answered_session(context: &ScoringContext) -> AssessmentSession {
        let mut session = AssessmentSession::new("sess-s");
        for _ in 0..2 {
            for t in OceanTrait::ALL {
                session.record_answer(context, &make_test_submission(t)).unwrap();
            }
        }
        session
    }

    fn make_test_override() -> AdminOverride {
        AdminOverride {
            decision: Decision::Declined,
            max_amount: None,
            duration_months: None,
            apr: None,
            justification: "Business registration could not be verified".to_string(),
            reviewer: "reviewer-1".to_string(),
        }
    }

    #[test]
    fn test_happy_path() {
        let context = ScoringContext::default();
        let mut session = answered_session(&context);
        assert_eq!(session.responses().len(), 10);
        assert!(session.is_complete(&context));

        let assessment = session.complete_phase1(&context, make_test_time()).unwrap();
        assert_eq!(assessment.phase1_traits, TraitVector::uniform(4.0));
        assert_eq!(session.status(), SessionStatus::Phase1Complete);

        let bundle = BehavioralSignalBundle::empty("game-s");
        session
            .complete_phase2(&context, bundle, make_test_time())
            .unwrap();
        assert_eq!(session.status(), SessionStatus::Phase2Complete);
        assert!(session.assessment().unwrap().has_phase2());
        assert!(session.behavioral_scores().is_some());

        session.finalize(make_test_time()).unwrap();
        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.report_input().is_some());
    }

    #[test]
    fn test_responses_must_arrive_in_order() {
        let context = ScoringContext::default();
        let mut session = answered_session(&context);
        let mut skipped = session.responses()[0].clone();
        skipped.sequence_index = 12;
        assert!(matches!(
            session.record_response(skipped),
            Err(ScoringError::OutOfOrderResponse { expected: 10, actual: 12 })
        ));

        let mut foreign = session.responses()[0].clone();
        foreign.sequence_index = 10;
        foreign.session_id = "other".to_string();
        assert!(matches!(
            session.record_response(foreign),
            Err(ScoringError::SessionMismatch { .. })
        ));
    }

    #[test]
    fn test_phase1_requires_stopping_rule() {
        let context = ScoringContext::default();
        let mut session = AssessmentSession::new("sess-short");
        assert!(matches!(
            session.complete_phase1(&context, make_test_time()),
            Err(ScoringError::InvalidInput(_))
        ));

        session
            .record_answer(&context, &make_test_submission(OceanTrait::Openness))
            .unwrap();
        assert!(matches!(
            session.complete_phase1(&context, make_test_time()),
            Err(ScoringError::PreconditionViolation(_))
        ));
        assert_eq!(session.status(), SessionStatus::InProgress);
    }

    #[test]
    fn test_off_scale_answer_not_recorded() {
        let context = ScoringContext::default();
        let mut session = AssessmentSession::new("sess-o");
        let mut submission = make_test_submission(OceanTrait::Conscientiousness);
        submission.question.options[0].score = 7.5;

        assert!(matches!(
            session.record_answer(&context, &submission),
            Err(ScoringError::InvalidInput(_))
        ));
        assert!(session.responses().is_empty());
    }

    #[test]
    fn test_phase2_rejects_non_finite_bundle() {
        let context = ScoringContext::default();
        let mut session = answered_session(&context);
        session.complete_phase1(&context, make_test_time()).unwrap();
        let phase1 = session.assessment().unwrap().clone();

        let mut bundle = BehavioralSignalBundle::empty("game-nan");
        bundle.crowd_time_ms = f64::NAN;
        assert!(matches!(
            session.complete_phase2(&context, bundle, make_test_time()),
            Err(ScoringError::InvalidBundle(_))
        ));
        assert_eq!(session.status(), SessionStatus::Phase1Complete);
        assert!(session.behavioral_scores().is_none());
        assert_eq!(session.assessment().unwrap(), &phase1);
        assert!(!session.assessment().unwrap().has_phase2());
    }

    #[test]
    fn test_out_of_order_transitions_rejected() {
        let context = ScoringContext::default();
        let mut session = AssessmentSession::new("sess-t");

        assert!(matches!(
            session.complete_phase2(&context, BehavioralSignalBundle::empty("g"), make_test_time()),
            Err(ScoringError::InvalidTransition { .. })
        ));
        assert!(session.finalize(make_test_time()).is_err());
        assert!(session
            .apply_override(&make_test_override(), make_test_time())
            .is_err());

        let mut session = answered_session(&context);
        session.complete_phase1(&context, make_test_time()).unwrap();
        assert!(session
            .record_answer(&context, &make_test_submission(OceanTrait::Openness))
            .is_err());
        assert!(session.complete_phase1(&context, make_test_time()).is_err());
        assert!(session.finalize(make_test_time()).is_err());
    }

    #[test]
    fn test_override_is_final() {
        let context = ScoringContext::default();
        let mut session = answered_session(&context);
        session.complete_phase1(&context, make_test_time()).unwrap();

        session
            .apply_override(&make_test_override(), make_test_time())
            .unwrap();
        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.is_overridden());

        let assessment = session.assessment().unwrap();
        assert_eq!(assessment.decision, Decision::Declined);
        assert_eq!(
            assessment.user_facing_decision,
            UserFacingDecision::PendingApproval
        );
        assert!(session.recommendation().unwrap().is_overridden);

        // Later scoring cannot replace the override
        assert!(matches!(
            session.complete_phase2(&context, BehavioralSignalBundle::empty("g"), make_test_time()),
            Err(ScoringError::InvalidTransition { .. })
        ));
        assert_eq!(session.assessment().unwrap().decision, Decision::Declined);
    }

    #[test]
    fn test_next_question_uses_variance_and_recent_types() {
        let context = ScoringContext::default();
        let mut session = AssessmentSession::new("sess-q");
        for t in [OceanTrait::Openness, OceanTrait::Openness] {
            session.record_answer(&context, &make_test_submission(t)).unwrap();
        }

        // Openness has variance 0; everything else is still at 1.0
        let candidates = vec![
            make_test_candidate(OceanTrait::Openness, QuestionType::Swipe),
            make_test_candidate(OceanTrait::Agreeableness, QuestionType::Slider),
            make_test_candidate(OceanTrait::Neuroticism, QuestionType::Ranking),
        ];
        assert_eq!(session.next_question(&context, &candidates).unwrap(), 2);

        let oversized = vec![make_test_candidate(OceanTrait::Openness, QuestionType::Swipe); 4];
        assert!(matches!(
            session.next_question(&context, &oversized),
            Err(ScoringError::InvalidCandidateBatch(_))
        ));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SessionStatus::Phase1Complete).unwrap();
        assert_eq!(json, "\"phase1_complete\"");
        assert_eq!(SessionStatus::Phase2Complete.to_string(), "phase2_complete");
    }
}
