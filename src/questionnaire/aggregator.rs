//! Trait aggregation
//!
//! Reduces a response history to per-trait averages and per-trait variances.
//! Both are always derived fresh from the full history.

use crate::questionnaire::types::QuestionResponse;
use crate::types::{OceanTrait, TraitVector, VarianceMap, RAW_MIDPOINT};

/// Variance assigned to traits with fewer than two observations
pub const INSUFFICIENT_DATA_VARIANCE: f64 = 1.0;

/// Aggregator for self-report responses
pub struct TraitAggregator;

impl TraitAggregator {
    /// Mean raw score per trait; unmeasured traits sit at the midpoint (3.0)
    pub fn averages(responses: &[QuestionResponse]) -> TraitVector {
        TraitVector::from_fn(|t| {
            let scores = scores_for(responses, t);
            if scores.is_empty() {
                RAW_MIDPOINT
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            }
        })
    }

    /// Population variance per trait; fewer than two observations yields 1.0
    pub fn variances(responses: &[QuestionResponse]) -> VarianceMap {
        VarianceMap::from_fn(|t| population_variance(&scores_for(responses, t)))
    }

    /// Number of responses recorded per trait
    pub fn counts(responses: &[QuestionResponse]) -> [usize; 5] {
        OceanTrait::ALL.map(|t| responses.iter().filter(|r| r.target_trait == t).count())
    }
}

/// Trait with the highest variance.
///
/// Ties go to the earliest trait in O, C, E, A, N order. When every trait
/// has the same variance (including the state before any answers),
/// conscientiousness is returned.
pub fn highest_variance_trait(variances: &VarianceMap) -> OceanTrait {
    let first = variances.get(OceanTrait::Openness);
    if OceanTrait::ALL.iter().all(|&t| variances.get(t) == first) {
        return OceanTrait::Conscientiousness;
    }

    let mut best = OceanTrait::Openness;
    for t in OceanTrait::ALL {
        if variances.get(t) > variances.get(best) {
            best = t;
        }
    }
    best
}

fn scores_for(responses: &[QuestionResponse], t: OceanTrait) -> Vec<f64> {
    responses
        .iter()
        .filter(|r| r.target_trait == t)
        .map(|r| r.score)
        .collect()
}

fn population_variance(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return INSUFFICIENT_DATA_VARIANCE;
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n
}
