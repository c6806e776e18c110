//! Self-report question types
//!
//! Candidate questions arrive from the external question generator; answered
//! questions become immutable [`QuestionResponse`] records.

use crate::error::ScoringError;
use crate::types::{OceanTrait, RAW_MAX, RAW_MIN};
use serde::{Deserialize, Serialize};

/// UI format of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Slider,
    Scenario,
    ImageSelect,
    Ranking,
    Swipe,
}

/// One selectable answer of a candidate question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: String,
    /// Raw-scale score (1-5) recorded when this option is chosen
    pub score: f64,
    /// Trait the generator associated with this option, if any
    #[serde(default, rename = "trait", skip_serializing_if = "Option::is_none")]
    pub target_trait: Option<OceanTrait>,
}

/// A question proposed by the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Trait this question measures
    #[serde(rename = "trait")]
    pub target_trait: OceanTrait,
    pub question_type: QuestionType,
    #[serde(default)]
    pub prompt: String,
    pub options: Vec<AnswerOption>,
    /// Display-only fields passed through untouched
    #[serde(flatten)]
    pub display: serde_json::Map<String, serde_json::Value>,
}

/// An answer as captured by the UI, before reaction-time adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question: CandidateQuestion,
    /// Index into `question.options`
    pub selected_option: usize,
    pub latency_ms: u64,
    #[serde(default)]
    pub hesitation_count: u32,
    #[serde(default)]
    pub changed_answer: bool,
    /// UI-specific answer data
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// A scored, answered question. Created once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub session_id: String,
    /// 0-based position in the session's answer history
    pub sequence_index: usize,
    pub question_type: QuestionType,
    #[serde(rename = "trait")]
    pub target_trait: OceanTrait,
    /// Raw-scale score (1-5) after reaction-time adjustment
    pub score: f64,
    pub latency_ms: u64,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub hesitation_count: u32,
    #[serde(default)]
    pub changed_answer: bool,
}

impl QuestionResponse {
    /// Reject records that could not have come from a valid answer
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.session_id.trim().is_empty() {
            return Err(ScoringError::InvalidInput(format!(
                "response {} has an empty session id",
                self.sequence_index
            )));
        }
        if !self.score.is_finite() || !(RAW_MIN..=RAW_MAX).contains(&self.score) {
            return Err(ScoringError::InvalidInput(format!(
                "response {} score {} outside [1, 5]",
                self.sequence_index, self.score
            )));
        }
        Ok(())
    }
}

/// Parse a JSON array of responses and validate each record and their ordering
pub fn parse_responses(json: &str) -> Result<Vec<QuestionResponse>, ScoringError> {
    let responses: Vec<QuestionResponse> = serde_json::from_str(json)
        .map_err(|e| ScoringError::ParseError(format!("Failed to parse responses: {e}")))?;
    validate_history(&responses)?;
    Ok(responses)
}

/// Check a full answer history: valid records, one session, contiguous order
pub fn validate_history(responses: &[QuestionResponse]) -> Result<(), ScoringError> {
    let Some(first) = responses.first() else {
        return Ok(());
    };

    for (expected, response) in responses.iter().enumerate() {
        response.validate()?;
        if response.session_id != first.session_id {
            return Err(ScoringError::SessionMismatch {
                expected: first.session_id.clone(),
                actual: response.session_id.clone(),
            });
        }
        if response.sequence_index != expected {
            return Err(ScoringError::OutOfOrderResponse {
                expected,
                actual: response.sequence_index,
            });
        }
    }
    Ok(())
}
