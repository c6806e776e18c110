//! Candidate batch intake
//!
//! The question generator is an external collaborator; its output is checked
//! for shape here and malformed batches are rejected deterministically.

use crate::config::QuestionnaireConfig;
use crate::error::ScoringError;
use crate::questionnaire::types::CandidateQuestion;
use crate::types::{RAW_MAX, RAW_MIN};

/// Parse a JSON array of candidate questions and validate the batch
pub fn parse_candidate_batch(
    json: &str,
    config: &QuestionnaireConfig,
) -> Result<Vec<CandidateQuestion>, ScoringError> {
    let batch: Vec<CandidateQuestion> = serde_json::from_str(json).map_err(|e| {
        ScoringError::InvalidCandidateBatch(format!("Failed to parse candidates: {e}"))
    })?;
    validate_candidate_batch(&batch, config)?;
    Ok(batch)
}

/// Check a batch of candidates produced by the generator
pub fn validate_candidate_batch(
    batch: &[CandidateQuestion],
    config: &QuestionnaireConfig,
) -> Result<(), ScoringError> {
    if batch.is_empty() {
        return Err(ScoringError::InvalidCandidateBatch(
            "batch contains no candidates".to_string(),
        ));
    }
    if batch.len() > config.candidate_batch_size {
        return Err(ScoringError::InvalidCandidateBatch(format!(
            "batch contains {} candidates, at most {} allowed",
            batch.len(),
            config.candidate_batch_size
        )));
    }

    for (index, candidate) in batch.iter().enumerate() {
        if candidate.options.is_empty() {
            return Err(ScoringError::InvalidCandidateBatch(format!(
                "candidate {index} has no options"
            )));
        }
        if let Some(option) = candidate
            .options
            .iter()
            .find(|o| !o.score.is_finite() || !(RAW_MIN..=RAW_MAX).contains(&o.score))
        {
            return Err(ScoringError::InvalidCandidateBatch(format!(
                "candidate {index} option '{}' has score {} outside [1, 5]",
                option.label, option.score
            )));
        }
    }

    Ok(())
}
