//! Question selection policy
//!
//! Picks the next question from a generator batch and decides when adaptive
//! self-report collection can stop.

use crate::config::QuestionnaireConfig;
use crate::error::ScoringError;
use crate::questionnaire::types::{CandidateQuestion, QuestionType};
use crate::types::{OceanTrait, VarianceMap};
use tracing::debug;

/// Stopping rule for adaptive questioning.
///
/// - `count >= max_questions` always completes
/// - `count < min_questions` never completes
/// - otherwise complete only when every trait variance is below the threshold
pub fn is_complete(
    variances: &VarianceMap,
    count: usize,
    variance_threshold: f64,
    min_questions: usize,
    max_questions: usize,
) -> bool {
    if count >= max_questions {
        return true;
    }
    if count < min_questions {
        return false;
    }
    OceanTrait::ALL
        .iter()
        .all(|&t| variances.get(t) < variance_threshold)
}

/// Information-gain policy bound to questionnaire settings
pub struct QuestionPolicy<'a> {
    config: &'a QuestionnaireConfig,
}

impl<'a> QuestionPolicy<'a> {
    pub fn new(config: &'a QuestionnaireConfig) -> Self {
        Self { config }
    }

    /// Score of a single candidate: trait variance plus a bonus for an unused format
    pub fn candidate_score(
        &self,
        candidate: &CandidateQuestion,
        variances: &VarianceMap,
        recent_types: &[QuestionType],
    ) -> f64 {
        let bonus = if recent_types.contains(&candidate.question_type) {
            0.0
        } else {
            self.config.diversity_bonus
        };
        variances.get(candidate.target_trait) + bonus
    }

    /// Index of the best candidate; the first one wins ties
    pub fn select_optimal_question(
        &self,
        candidates: &[CandidateQuestion],
        variances: &VarianceMap,
        recent_types: &[QuestionType],
    ) -> Result<usize, ScoringError> {
        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in candidates.iter().enumerate() {
            let score = self.candidate_score(candidate, variances, recent_types);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((index, score)),
            }
        }

        let (index, score) = best.ok_or_else(|| {
            ScoringError::InvalidCandidateBatch("no candidates to select from".to_string())
        })?;
        debug!(index, score, "selected next question");
        Ok(index)
    }

    /// Stopping rule with the configured threshold and bounds
    pub fn is_complete(&self, variances: &VarianceMap, count: usize) -> bool {
        is_complete(
            variances,
            count,
            self.config.variance_threshold,
            self.config.min_questions,
            self.config.max_questions,
        )
    }

    /// Trailing window of question types used for the diversity bonus
    pub fn recent_types<'r>(&self, history: &'r [QuestionType]) -> &'r [QuestionType] {
        let start = history.len().saturating_sub(self.config.recent_type_window);
        &history[start..]
    }
}
