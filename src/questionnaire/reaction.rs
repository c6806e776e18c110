//! Reaction-time adjustment
//!
//! A closed-form modifier applied to the selected option's score before the
//! response is recorded. Quick, decisive answers are taken at slightly more
//! than face value; slow, hesitant or revised answers are pulled towards the
//! scale midpoint.

use crate::config::ReactionTimeConfig;
use crate::error::ScoringError;
use crate::questionnaire::types::{AnswerSubmission, QuestionResponse};
use crate::types::{RAW_MAX, RAW_MIDPOINT, RAW_MIN};

/// Adjust a raw answer score for how it was given.
///
/// ```text
/// adjusted = 3 + (score - 3) * speed_factor * max(min_factor, hesitation_shrink * change_shrink)
/// ```
pub fn adjust_score(
    score: f64,
    latency_ms: u64,
    hesitation_count: u32,
    changed_answer: bool,
    config: &ReactionTimeConfig,
) -> f64 {
    let speed_factor = if latency_ms < config.fast_latency_ms {
        config.fast_factor
    } else if latency_ms > config.slow_latency_ms {
        config.slow_factor
    } else {
        1.0
    };

    let extra_hesitations = hesitation_count.saturating_sub(config.hesitation_allowance);
    let mut shrink = config.hesitation_factor.powi(extra_hesitations as i32);
    if changed_answer {
        shrink *= config.changed_answer_factor;
    }
    let shrink = shrink.max(config.min_factor);

    (RAW_MIDPOINT + (score - RAW_MIDPOINT) * speed_factor * shrink).clamp(RAW_MIN, RAW_MAX)
}

/// Turn an answer submission into an immutable response record
pub fn build_response(
    submission: &AnswerSubmission,
    session_id: &str,
    sequence_index: usize,
    config: &ReactionTimeConfig,
) -> Result<QuestionResponse, ScoringError> {
    let question = &submission.question;
    let option = question
        .options
        .get(submission.selected_option)
        .ok_or_else(|| {
            ScoringError::InvalidInput(format!(
                "selected option {} out of range for {} options",
                submission.selected_option,
                question.options.len()
            ))
        })?;
    if !(RAW_MIN..=RAW_MAX).contains(&option.score) {
        return Err(ScoringError::InvalidInput(format!(
            "option '{}' score {} outside [{RAW_MIN}, {RAW_MAX}]",
            option.label, option.score
        )));
    }

    let score = adjust_score(
        option.score,
        submission.latency_ms,
        submission.hesitation_count,
        submission.changed_answer,
        config,
    );

    let response = QuestionResponse {
        session_id: session_id.to_string(),
        sequence_index,
        question_type: question.question_type,
        target_trait: question.target_trait,
        score,
        latency_ms: submission.latency_ms,
        payload: submission.payload.clone(),
        hesitation_count: submission.hesitation_count,
        changed_answer: submission.changed_answer,
    };
    response.validate()?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::types::{AnswerOption, CandidateQuestion, QuestionType};
    use crate::types::OceanTrait;

    fn config() -> ReactionTimeConfig {
        ReactionTimeConfig::default()
    }

    fn submission(selected_option: usize, latency_ms: u64) -> AnswerSubmission {
        AnswerSubmission {
            question: CandidateQuestion {
                id: Some("q-1".to_string()),
                target_trait: OceanTrait::Extraversion,
                question_type: QuestionType::MultipleChoice,
                prompt: "At a trade fair you...".to_string(),
                options: vec![
                    AnswerOption {
                        label: "Work the room".to_string(),
                        score: 5.0,
                        target_trait: None,
                    },
                    AnswerOption {
                        label: "Stay at the booth".to_string(),
                        score: 2.0,
                        target_trait: None,
                    },
                ],
                display: serde_json::Map::new(),
            },
            selected_option,
            latency_ms,
            hesitation_count: 0,
            changed_answer: false,
            payload: serde_json::json!({ "tap_x": 120 }),
        }
    }

    #[test]
    fn test_normal_latency_is_unchanged() {
        assert!((adjust_score(4.0, 3_000, 0, false, &config()) - 4.0).abs() < 1e-12);
        assert!((adjust_score(3.0, 100, 5, true, &config()) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fast_answer_amplified_and_clamped() {
        // 3 + 1.0 * 1.1 = 4.1
        assert!((adjust_score(4.0, 800, 0, false, &config()) - 4.1).abs() < 1e-12);
        // 3 + 2.0 * 1.1 = 5.2 -> clamped to 5
        assert_eq!(adjust_score(5.0, 800, 0, false, &config()), 5.0);
    }

    #[test]
    fn test_slow_answer_pulled_to_midpoint() {
        // 3 - 2.0 * 0.85 = 1.3
        assert!((adjust_score(1.0, 12_000, 0, false, &config()) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_hesitation_and_changed_answer_shrink() {
        // Within allowance: no change
        assert!((adjust_score(5.0, 3_000, 2, false, &config()) - 5.0).abs() < 1e-12);
        // One hesitation over allowance plus a change: 0.95 * 0.95
        let expected = 3.0 + 2.0 * 0.95 * 0.95;
        assert!((adjust_score(5.0, 3_000, 3, true, &config()) - expected).abs() < 1e-12);
        // Shrink floors at min_factor
        let floored = adjust_score(5.0, 3_000, 200, true, &config());
        assert!((floored - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_response_uses_question_trait_and_adjusted_score() {
        let response = build_response(&submission(0, 3_000), "sess-9", 4, &config()).unwrap();
        assert_eq!(response.session_id, "sess-9");
        assert_eq!(response.sequence_index, 4);
        assert_eq!(response.target_trait, OceanTrait::Extraversion);
        assert_eq!(response.question_type, QuestionType::MultipleChoice);
        assert_eq!(response.score, 5.0);
        assert_eq!(response.payload["tap_x"], 120);
    }

    #[test]
    fn test_build_response_rejects_bad_option_index() {
        assert!(matches!(
            build_response(&submission(7, 3_000), "sess-9", 0, &config()),
            Err(ScoringError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_build_response_rejects_off_scale_option() {
        // Clamping would otherwise hide the off-scale option
        let mut off_scale = submission(0, 12_000);
        off_scale.question.options[0].score = 7.5;
        assert!(matches!(
            build_response(&off_scale, "sess-9", 0, &config()),
            Err(ScoringError::InvalidInput(_))
        ));

        off_scale.question.options[0].score = f64::NAN;
        assert!(build_response(&off_scale, "sess-9", 0, &config()).is_err());

        off_scale.question.options[0].score = 1.0;
        assert!(build_response(&off_scale, "sess-9", 0, &config()).is_ok());
    }
}
