//! Report encoder
//!
//! Encodes scoring results into the admin report and the applicant payload.

use crate::assessment::{Assessment, LoanRecommendation};
use crate::behavior::{BehavioralScores, BehavioralSignalBundle};
use crate::blending::ConsistencyIndex;
use crate::decision::ApplicantResponse;
use crate::error::ScoringError;
use crate::session::SessionStatus;
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current admin report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Full scoring detail for the admin view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub session_id: String,
    pub status: SessionStatus,
    pub assessment: Assessment,
    pub consistency: Option<ConsistencyIndex>,
    pub recommendation: LoanRecommendation,
    /// What the applicant is shown for this assessment
    pub applicant_view: ApplicantResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral_scores: Option<BehavioralScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_bundle: Option<BehavioralSignalBundle>,
}

/// Borrowed inputs for one report
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub status: SessionStatus,
    pub assessment: &'a Assessment,
    pub recommendation: &'a LoanRecommendation,
    pub behavioral: Option<&'a BehavioralScores>,
    pub bundle: Option<&'a BehavioralSignalBundle>,
}

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode an admin report
    pub fn encode(&self, input: &ReportInput<'_>) -> AdminReport {
        let assessment = input.assessment;

        AdminReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            session_id: assessment.session_id.clone(),
            status: input.status,
            assessment: assessment.clone(),
            consistency: assessment.consistency.clone(),
            recommendation: input.recommendation.clone(),
            applicant_view: assessment.applicant_response(),
            behavioral_scores: input.behavioral.cloned(),
            signal_bundle: input.bundle.cloned(),
        }
    }

    /// Encode an admin report to pretty JSON
    pub fn encode_to_json(&self, input: &ReportInput<'_>) -> Result<String, ScoringError> {
        let report = self.encode(input);
        serde_json::to_string_pretty(&report).map_err(ScoringError::JsonError)
    }

    /// Encode the applicant payload to compact JSON
    pub fn encode_applicant_to_json(
        &self,
        assessment: &Assessment,
    ) -> Result<String, ScoringError> {
        serde_json::to_string(&assessment.applicant_response()).map_err(ScoringError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ScoringContext;
    use crate::questionnaire::{QuestionResponse, QuestionType};
    use crate::types::OceanTrait;
    use chrono::TimeZone;

    fn make_test_responses() -> Vec<QuestionResponse> {
        OceanTrait::ALL
            .iter()
            .enumerate()
            .map(|(i, &t)| QuestionResponse {
                session_id: "sess-enc".to_string(),
                sequence_index: i,
                question_type: QuestionType::Scenario,
                target_trait: t,
                score: 4.0,
                latency_ms: 3_000,
                payload: serde_json::Value::Null,
                hesitation_count: 0,
                changed_answer: false,
            })
            .collect()
    }

    #[test]
    fn test_encoder_producer_metadata() {
        let context = ScoringContext::default();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let (assessment, recommendation) =
            context.score_phase1(&make_test_responses(), now).unwrap();

        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&ReportInput {
            status: SessionStatus::Phase1Complete,
            assessment: &assessment,
            recommendation: &recommendation,
            behavioral: None,
            bundle: None,
        });

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, "mindset-credit");
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.session_id, "sess-enc");
        assert!(report.consistency.is_none());
        assert_eq!(
            report.applicant_view.decision,
            assessment.user_facing_decision
        );
    }

    #[test]
    fn test_encoder_json_omits_absent_phase2() {
        let context = ScoringContext::default();
        let (assessment, recommendation) = context
            .score_phase1(&make_test_responses(), Utc::now())
            .unwrap();

        let json = ReportEncoder::new()
            .encode_to_json(&ReportInput {
                status: SessionStatus::Phase1Complete,
                assessment: &assessment,
                recommendation: &recommendation,
                behavioral: None,
                bundle: None,
            })
            .unwrap();

        let parsed: AdminReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.assessment.session_id, assessment.session_id);
        assert_eq!(parsed.assessment.decision, assessment.decision);
        assert!(!json.contains("behavioral_scores"));
        assert!(!json.contains("signal_bundle"));
    }

    #[test]
    fn test_unique_instance_ids() {
        let a = ReportEncoder::new();
        let b = ReportEncoder::new();
        assert_ne!(a.instance_id(), b.instance_id());
    }

    #[test]
    fn test_applicant_json() {
        let context = ScoringContext::default();
        let (assessment, _) = context
            .score_phase1(&make_test_responses(), Utc::now())
            .unwrap();
        let json = ReportEncoder::new()
            .encode_applicant_to_json(&assessment)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("decision").is_some());
        assert!(value.get("final_pd").is_none());
    }
}
