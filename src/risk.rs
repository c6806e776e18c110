//! Risk model
//!
//! Maps raw trait scores to per-trait risk contributions, a weighted risk value
//! and a probability of default (PD).
//!
//! ```text
//! risk_C  = (5 - C) / 4          conscientiousness is protective
//! risk_x  = (x - 1) / 4          for N, A, O, E
//! weighted = 0.35 C + 0.25 N + 0.18 A + 0.12 O + 0.10 E
//! pd       = clamp(0.02 + weighted * 0.33, 0.02, 0.35)
//! ```

use crate::config::RiskConfig;
use crate::types::{NormalizedTraits, OceanTrait, RiskRating, TraitVector, RAW_MAX, RAW_MIN};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every intermediate value of a PD calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdBreakdown {
    /// Per-trait risk contribution (0-1)
    pub contributions: NormalizedTraits,
    pub weighted_risk: f64,
    /// PD before the profile modifier
    pub raw_pd: f64,
    pub modifier: f64,
    /// PD after the profile modifier
    pub pd: f64,
    pub rating: RiskRating,
}

/// Risk model bound to a calibration
#[derive(Debug, Clone)]
pub struct RiskModel<'a> {
    config: &'a RiskConfig,
}

impl<'a> RiskModel<'a> {
    pub fn new(config: &'a RiskConfig) -> Self {
        Self { config }
    }

    /// Per-trait risk contribution in [0, 1]; conscientiousness is inverted
    pub fn risk_contribution(&self, traits: &TraitVector) -> NormalizedTraits {
        NormalizedTraits::from_fn(|t| trait_risk(t, traits.get(t)))
    }

    /// Importance-weighted sum of the risk contributions
    pub fn weighted_risk(&self, traits: &TraitVector) -> f64 {
        let contributions = self.risk_contribution(traits);
        OceanTrait::ALL
            .iter()
            .map(|&t| self.config.weights.get(t) * contributions.get(t))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    /// Probability of default before any profile modifier
    pub fn pd(&self, traits: &TraitVector) -> f64 {
        let weighted = self.weighted_risk(traits);
        self.clamp_pd(self.config.pd_base + weighted * self.config.pd_scale)
    }

    /// Add a signed modifier and re-clamp into the PD bounds
    pub fn apply_modifier(&self, pd: f64, modifier: f64) -> f64 {
        self.clamp_pd(pd + modifier)
    }

    pub fn risk_rating(&self, pd: f64) -> RiskRating {
        if pd < self.config.low_below {
            RiskRating::Low
        } else if pd < self.config.moderate_below {
            RiskRating::Moderate
        } else {
            RiskRating::Elevated
        }
    }

    /// Full calculation: contributions, weighted risk, raw PD, modified PD and rating
    pub fn calculate_full_pd(&self, traits: &TraitVector, modifier: f64) -> PdBreakdown {
        let contributions = self.risk_contribution(traits);
        let weighted_risk = self.weighted_risk(traits);
        let raw_pd = self.clamp_pd(self.config.pd_base + weighted_risk * self.config.pd_scale);
        let pd = self.apply_modifier(raw_pd, modifier);
        let rating = self.risk_rating(pd);

        debug!(weighted_risk, raw_pd, modifier, pd, rating = rating.as_str(), "computed PD");

        PdBreakdown {
            contributions,
            weighted_risk,
            raw_pd,
            modifier,
            pd,
            rating,
        }
    }

    fn clamp_pd(&self, pd: f64) -> f64 {
        pd.clamp(self.config.pd_floor, self.config.pd_ceiling)
    }
}

fn trait_risk(t: OceanTrait, raw: f64) -> f64 {
    let span = RAW_MAX - RAW_MIN;
    let risk = match t {
        OceanTrait::Conscientiousness => (RAW_MAX - raw) / span,
        _ => (raw - RAW_MIN) / span,
    };
    risk.clamp(0.0, 1.0)
}
