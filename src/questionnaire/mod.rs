//! Phase 1: adaptive self-report questionnaire
//!
//! Candidate questions come from an external generator. This module validates
//! them, picks the next question, adjusts answer scores for reaction time and
//! aggregates the answer history into trait averages and variances.

pub mod aggregator;
pub mod candidates;
pub mod reaction;
pub mod selection;
pub mod types;

pub use aggregator::{highest_variance_trait, TraitAggregator};
pub use candidates::{parse_candidate_batch, validate_candidate_batch};
pub use reaction::{adjust_score, build_response};
pub use selection::{is_complete, QuestionPolicy};
pub use types::{
    parse_responses, validate_history, AnswerOption, AnswerSubmission, CandidateQuestion,
    QuestionResponse, QuestionType,
};
