//! Scoring configuration
//!
//! Every weight map, threshold and catalog used by the pipeline lives here.
//! A `ScoringConfig` is loaded once (defaults or JSON), validated by
//! [`crate::pipeline::ScoringContext::new`], and never mutated afterwards.

use crate::decision::LoanTermsTable;
use crate::error::ScoringError;
use crate::profiles::{default_catalog, MoneyProfile};
use crate::types::{OceanTrait, RAW_MAX, RAW_MIN};
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that weights sum to one
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Complete scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub risk: RiskConfig,
    pub blend: BlendWeights,
    pub consistency: ConsistencyConfig,
    pub questionnaire: QuestionnaireConfig,
    pub behavior: BehaviorConfig,
    pub reaction: ReactionTimeConfig,
    pub loan_terms: LoanTermsTable,
    pub profiles: Vec<MoneyProfile>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            blend: BlendWeights::default(),
            consistency: ConsistencyConfig::default(),
            questionnaire: QuestionnaireConfig::default(),
            behavior: BehaviorConfig::default(),
            reaction: ReactionTimeConfig::default(),
            loan_terms: LoanTermsTable::default(),
            profiles: default_catalog(),
        }
    }
}

impl ScoringConfig {
    /// Load configuration from JSON; omitted sections keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        serde_json::from_str(json)
            .map_err(|e| ScoringError::InvalidConfig(format!("Failed to parse config: {e}")))
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ScoringError> {
        serde_json::to_string_pretty(self).map_err(ScoringError::JsonError)
    }

    /// Check internal consistency of every table
    pub fn validate(&self) -> Result<(), ScoringError> {
        self.risk.validate()?;
        self.blend.validate()?;
        self.consistency.validate()?;
        self.questionnaire.validate()?;
        self.behavior.validate()?;
        self.reaction.validate()?;
        self.loan_terms.validate()?;
        validate_catalog(&self.profiles)
    }
}

/// Importance weight per trait, shared by the risk model and the consistency index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitWeights {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl Default for TraitWeights {
    fn default() -> Self {
        Self {
            openness: 0.12,
            conscientiousness: 0.35,
            extraversion: 0.10,
            agreeableness: 0.18,
            neuroticism: 0.25,
        }
    }
}

impl TraitWeights {
    pub fn get(&self, t: OceanTrait) -> f64 {
        match t {
            OceanTrait::Openness => self.openness,
            OceanTrait::Conscientiousness => self.conscientiousness,
            OceanTrait::Extraversion => self.extraversion,
            OceanTrait::Agreeableness => self.agreeableness,
            OceanTrait::Neuroticism => self.neuroticism,
        }
    }

    pub fn sum(&self) -> f64 {
        OceanTrait::ALL.iter().map(|&t| self.get(t)).sum()
    }
}

/// Risk model calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub weights: TraitWeights,
    /// PD at zero weighted risk
    pub pd_base: f64,
    /// PD added per unit of weighted risk
    pub pd_scale: f64,
    pub pd_floor: f64,
    pub pd_ceiling: f64,
    /// PD below this is rated low
    pub low_below: f64,
    /// PD below this (and at or above `low_below`) is rated moderate
    pub moderate_below: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: TraitWeights::default(),
            pd_base: 0.02,
            pd_scale: 0.33,
            pd_floor: 0.02,
            pd_ceiling: 0.35,
            low_below: 0.08,
            moderate_below: 0.18,
        }
    }
}

impl RiskConfig {
    fn validate(&self) -> Result<(), ScoringError> {
        validate_weights("risk.weights", &self.weights)?;
        if !(0.0..1.0).contains(&self.pd_floor) || self.pd_floor >= self.pd_ceiling {
            return Err(ScoringError::InvalidConfig(format!(
                "PD floor {} must be in [0, 1) and below ceiling {}",
                self.pd_floor, self.pd_ceiling
            )));
        }
        if self.pd_ceiling > 1.0 {
            return Err(ScoringError::InvalidConfig(format!(
                "PD ceiling {} exceeds 1.0",
                self.pd_ceiling
            )));
        }
        if self.low_below >= self.moderate_below {
            return Err(ScoringError::InvalidConfig(
                "risk bands must be strictly increasing".to_string(),
            ));
        }
        Ok(())
    }
}

/// Self-report / behavioral split for a single trait
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendPair {
    pub self_report: f64,
    pub behavioral: f64,
}

impl BlendPair {
    pub const fn new(self_report: f64, behavioral: f64) -> Self {
        Self {
            self_report,
            behavioral,
        }
    }
}

/// Per-trait blend weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub openness: BlendPair,
    pub conscientiousness: BlendPair,
    pub extraversion: BlendPair,
    pub agreeableness: BlendPair,
    pub neuroticism: BlendPair,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            openness: BlendPair::new(0.45, 0.55),
            conscientiousness: BlendPair::new(0.55, 0.45),
            extraversion: BlendPair::new(0.55, 0.45),
            agreeableness: BlendPair::new(0.60, 0.40),
            neuroticism: BlendPair::new(0.50, 0.50),
        }
    }
}

impl BlendWeights {
    pub fn get(&self, t: OceanTrait) -> BlendPair {
        match t {
            OceanTrait::Openness => self.openness,
            OceanTrait::Conscientiousness => self.conscientiousness,
            OceanTrait::Extraversion => self.extraversion,
            OceanTrait::Agreeableness => self.agreeableness,
            OceanTrait::Neuroticism => self.neuroticism,
        }
    }

    fn validate(&self) -> Result<(), ScoringError> {
        for t in OceanTrait::ALL {
            let pair = self.get(t);
            if pair.self_report < 0.0 || pair.behavioral < 0.0 {
                return Err(ScoringError::InvalidConfig(format!(
                    "blend weights for {t} must be non-negative"
                )));
            }
            let sum = pair.self_report + pair.behavioral;
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(ScoringError::InvalidConfig(format!(
                    "blend weights for {t} sum to {sum}, expected 1.0"
                )));
            }
        }
        Ok(())
    }
}

/// Consistency classification bands (all upper-exclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    pub highly_consistent_below: f64,
    pub normal_variance_below: f64,
    pub moderate_discrepancy_below: f64,
    /// Overall discrepancy strictly above this forces manual review
    pub review_above: f64,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            highly_consistent_below: 0.20,
            normal_variance_below: 0.40,
            moderate_discrepancy_below: 0.60,
            review_above: 0.40,
        }
    }
}

impl ConsistencyConfig {
    fn validate(&self) -> Result<(), ScoringError> {
        let bands = [
            0.0,
            self.highly_consistent_below,
            self.normal_variance_below,
            self.moderate_discrepancy_below,
            1.0,
        ];
        if bands.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ScoringError::InvalidConfig(
                "consistency bands must be strictly increasing within (0, 1)".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.review_above) {
            return Err(ScoringError::InvalidConfig(format!(
                "consistency review threshold {} outside [0, 1]",
                self.review_above
            )));
        }
        Ok(())
    }
}

/// Adaptive questioning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnaireConfig {
    /// Every trait variance must fall below this to stop early
    pub variance_threshold: f64,
    pub min_questions: usize,
    pub max_questions: usize,
    /// Bonus for a question format not among the recent ones
    pub diversity_bonus: f64,
    /// Maximum number of candidates accepted per generator batch
    pub candidate_batch_size: usize,
    /// Number of most recent question types considered "recent"
    pub recent_type_window: usize,
}

impl Default for QuestionnaireConfig {
    fn default() -> Self {
        Self {
            variance_threshold: 0.5,
            min_questions: 10,
            max_questions: 20,
            diversity_bonus: 0.2,
            candidate_batch_size: 3,
            recent_type_window: 3,
        }
    }
}

impl QuestionnaireConfig {
    fn validate(&self) -> Result<(), ScoringError> {
        if self.min_questions > self.max_questions {
            return Err(ScoringError::InvalidConfig(format!(
                "min_questions {} exceeds max_questions {}",
                self.min_questions, self.max_questions
            )));
        }
        if self.max_questions == 0 || self.candidate_batch_size == 0 {
            return Err(ScoringError::InvalidConfig(
                "max_questions and candidate_batch_size must be positive".to_string(),
            ));
        }
        if self.variance_threshold <= 0.0 {
            return Err(ScoringError::InvalidConfig(
                "variance_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One band of the tap-deliberation step function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapBand {
    /// Mean inter-tap interval strictly below this falls in the band
    pub below_ms: f64,
    pub score: f64,
}

impl TapBand {
    pub const fn new(below_ms: f64, score: f64) -> Self {
        Self { below_ms, score }
    }
}

/// Gameplay extraction constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Crate count that maps to a risk index of 1.0
    pub max_cargo: f64,
    /// Ordered deliberation bands, evaluated first match wins
    pub tap_bands: Vec<TapBand>,
    /// Score when the mean interval is beyond every band
    pub tap_slow_score: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_cargo: 7.0,
            tap_bands: vec![
                TapBand::new(200.0, 0.2),
                TapBand::new(400.0, 0.5),
                TapBand::new(800.0, 0.9),
                TapBand::new(1200.0, 0.7),
            ],
            tap_slow_score: 0.4,
        }
    }
}

impl BehaviorConfig {
    fn validate(&self) -> Result<(), ScoringError> {
        if self.max_cargo <= 0.0 {
            return Err(ScoringError::InvalidConfig(
                "max_cargo must be positive".to_string(),
            ));
        }
        if self
            .tap_bands
            .windows(2)
            .any(|pair| pair[0].below_ms >= pair[1].below_ms)
        {
            return Err(ScoringError::InvalidConfig(
                "tap bands must be strictly increasing".to_string(),
            ));
        }
        let scores_in_range = self
            .tap_bands
            .iter()
            .map(|b| b.score)
            .chain(std::iter::once(self.tap_slow_score))
            .all(|s| (0.0..=1.0).contains(&s));
        if !scores_in_range {
            return Err(ScoringError::InvalidConfig(
                "tap band scores must lie in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reaction-time adjustment applied to selected answer scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionTimeConfig {
    /// Answers faster than this are treated as confident
    pub fast_latency_ms: u64,
    /// Answers slower than this are treated as uncertain
    pub slow_latency_ms: u64,
    /// Multiplier on the deviation from the midpoint for fast answers
    pub fast_factor: f64,
    /// Multiplier on the deviation from the midpoint for slow answers
    pub slow_factor: f64,
    /// Hesitations tolerated before shrinking
    pub hesitation_allowance: u32,
    pub hesitation_factor: f64,
    pub changed_answer_factor: f64,
    /// Lower bound on the combined shrink multiplier
    pub min_factor: f64,
}

impl Default for ReactionTimeConfig {
    fn default() -> Self {
        Self {
            fast_latency_ms: 1_500,
            slow_latency_ms: 8_000,
            fast_factor: 1.10,
            slow_factor: 0.85,
            hesitation_allowance: 2,
            hesitation_factor: 0.95,
            changed_answer_factor: 0.95,
            min_factor: 0.5,
        }
    }
}

impl ReactionTimeConfig {
    fn validate(&self) -> Result<(), ScoringError> {
        if self.fast_latency_ms >= self.slow_latency_ms {
            return Err(ScoringError::InvalidConfig(
                "fast_latency_ms must be below slow_latency_ms".to_string(),
            ));
        }
        let shrinks = [
            self.slow_factor,
            self.hesitation_factor,
            self.changed_answer_factor,
            self.min_factor,
        ];
        if shrinks.iter().any(|f| !(0.0..=1.0).contains(f)) || self.fast_factor < 1.0 {
            return Err(ScoringError::InvalidConfig(
                "reaction factors out of range".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_weights(name: &str, weights: &TraitWeights) -> Result<(), ScoringError> {
    if OceanTrait::ALL.iter().any(|&t| weights.get(t) < 0.0) {
        return Err(ScoringError::InvalidConfig(format!(
            "{name} must be non-negative"
        )));
    }
    let sum = weights.sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ScoringError::InvalidConfig(format!(
            "{name} sum to {sum}, expected 1.0"
        )));
    }
    Ok(())
}

fn validate_catalog(profiles: &[MoneyProfile]) -> Result<(), ScoringError> {
    if profiles.is_empty() {
        return Err(ScoringError::InvalidConfig(
            "money profile catalog is empty".to_string(),
        ));
    }
    for profile in profiles {
        let defined = profile.signature.len();
        if !(2..=5).contains(&defined) {
            return Err(ScoringError::InvalidConfig(format!(
                "profile '{}' defines {} traits, expected 2-5",
                profile.name, defined
            )));
        }
        if profile
            .signature
            .values()
            .any(|v| !(RAW_MIN..=RAW_MAX).contains(v))
        {
            return Err(ScoringError::InvalidConfig(format!(
                "profile '{}' has a signature value outside [1, 5]",
                profile.name
            )));
        }
        if profile.name.trim().is_empty() {
            return Err(ScoringError::InvalidConfig(
                "profile name must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}
