//! Blending engine
//!
//! Merges Phase-1 self-report averages (raw scale) with Phase-2 gameplay
//! scores (normalized scale) and measures how far the two sources disagree.

use crate::config::{BlendWeights, ConsistencyConfig, TraitWeights};
use crate::types::{normalize, NormalizedTraits, OceanTrait, TraitVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordered discrepancy bands between self-report and observed behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyFlag {
    HighlyConsistent,
    NormalVariance,
    ModerateDiscrepancy,
    HighDiscrepancy,
}

impl ConsistencyFlag {
    /// Classify an overall discrepancy; every band is upper-exclusive
    pub fn classify(overall: f64, bands: &ConsistencyConfig) -> Self {
        if overall < bands.highly_consistent_below {
            ConsistencyFlag::HighlyConsistent
        } else if overall < bands.normal_variance_below {
            ConsistencyFlag::NormalVariance
        } else if overall < bands.moderate_discrepancy_below {
            ConsistencyFlag::ModerateDiscrepancy
        } else {
            ConsistencyFlag::HighDiscrepancy
        }
    }
}

/// Discrepancy between the two measurement sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyIndex {
    /// Absolute per-trait difference on the normalized scale
    pub differences: NormalizedTraits,
    /// Importance-weighted mean of the differences
    pub overall: f64,
    pub flag: ConsistencyFlag,
}

impl ConsistencyIndex {
    /// Whether the discrepancy is large enough to force manual review
    pub fn requires_review(&self, bands: &ConsistencyConfig) -> bool {
        self.overall > bands.review_above
    }
}

/// Blend raw self-report scores with normalized behavioral scores.
///
/// Each trait is blended on the normalized scale and converted back to raw.
pub fn blend(
    phase1_raw: &TraitVector,
    phase2_normalized: &NormalizedTraits,
    weights: &BlendWeights,
) -> TraitVector {
    let phase1 = phase1_raw.to_normalized();
    let blended = NormalizedTraits::from_fn(|t| {
        let pair = weights.get(t);
        (phase1.get(t) * pair.self_report + phase2_normalized.get(t) * pair.behavioral)
            .clamp(0.0, 1.0)
    });
    let raw = blended.to_raw();

    debug!(
        o = raw.openness,
        c = raw.conscientiousness,
        e = raw.extraversion,
        a = raw.agreeableness,
        n = raw.neuroticism,
        "blended trait scores"
    );

    raw
}

/// Compute the consistency index between Phase-1 and Phase-2 scores
pub fn consistency_index(
    phase1_raw: &TraitVector,
    phase2_normalized: &NormalizedTraits,
    importance: &TraitWeights,
    bands: &ConsistencyConfig,
) -> ConsistencyIndex {
    let differences = NormalizedTraits::from_fn(|t| {
        (normalize(phase1_raw.get(t)).clamp(0.0, 1.0) - phase2_normalized.get(t)).abs()
    });

    let total_weight = importance.sum();
    let overall = if total_weight > 0.0 {
        OceanTrait::ALL
            .iter()
            .map(|&t| importance.get(t) * differences.get(t))
            .sum::<f64>()
            / total_weight
    } else {
        0.0
    };
    let flag = ConsistencyFlag::classify(overall, bands);

    debug!(overall, ?flag, "computed consistency index");

    ConsistencyIndex {
        differences,
        overall,
        flag,
    }
}
