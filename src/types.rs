//! Core data types
//!
//! Trait vectors come in two scales that must never be mixed:
//! - raw scale (1.0 - 5.0), used by self-report answers and the risk model
//! - normalized scale (0.0 - 1.0), used by gameplay-derived scores
//!
//! The conversion between them is affine: `normalized = (raw - 1) / 4`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the raw trait scale
pub const RAW_MIN: f64 = 1.0;

/// Upper bound of the raw trait scale
pub const RAW_MAX: f64 = 5.0;

/// Midpoint of the raw scale, used when a trait has no observations
pub const RAW_MIDPOINT: f64 = 3.0;

/// Convert a raw (1-5) score to the normalized (0-1) scale
pub fn normalize(raw: f64) -> f64 {
    (raw - RAW_MIN) / (RAW_MAX - RAW_MIN)
}

/// Convert a normalized (0-1) score back to the raw (1-5) scale
pub fn denormalize(normalized: f64) -> f64 {
    RAW_MIN + normalized * (RAW_MAX - RAW_MIN)
}

/// The five OCEAN personality axes, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OceanTrait {
    #[serde(alias = "O")]
    Openness,
    #[serde(alias = "C")]
    Conscientiousness,
    #[serde(alias = "E")]
    Extraversion,
    #[serde(alias = "A")]
    Agreeableness,
    #[serde(alias = "N")]
    Neuroticism,
}

impl OceanTrait {
    /// All traits in enumeration order (O, C, E, A, N)
    pub const ALL: [OceanTrait; 5] = [
        OceanTrait::Openness,
        OceanTrait::Conscientiousness,
        OceanTrait::Extraversion,
        OceanTrait::Agreeableness,
        OceanTrait::Neuroticism,
    ];

    /// Single-letter code
    pub fn code(&self) -> char {
        match self {
            OceanTrait::Openness => 'O',
            OceanTrait::Conscientiousness => 'C',
            OceanTrait::Extraversion => 'E',
            OceanTrait::Agreeableness => 'A',
            OceanTrait::Neuroticism => 'N',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OceanTrait::Openness => "openness",
            OceanTrait::Conscientiousness => "conscientiousness",
            OceanTrait::Extraversion => "extraversion",
            OceanTrait::Agreeableness => "agreeableness",
            OceanTrait::Neuroticism => "neuroticism",
        }
    }
}

impl fmt::Display for OceanTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait scores on the raw (1-5) scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitVector {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl Default for TraitVector {
    fn default() -> Self {
        Self::uniform(RAW_MIDPOINT)
    }
}

impl TraitVector {
    pub fn new(o: f64, c: f64, e: f64, a: f64, n: f64) -> Self {
        Self {
            openness: o,
            conscientiousness: c,
            extraversion: e,
            agreeableness: a,
            neuroticism: n,
        }
    }

    /// Same value on every axis
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value, value)
    }

    /// Build a vector by evaluating `f` for each trait
    pub fn from_fn(mut f: impl FnMut(OceanTrait) -> f64) -> Self {
        Self {
            openness: f(OceanTrait::Openness),
            conscientiousness: f(OceanTrait::Conscientiousness),
            extraversion: f(OceanTrait::Extraversion),
            agreeableness: f(OceanTrait::Agreeableness),
            neuroticism: f(OceanTrait::Neuroticism),
        }
    }

    pub fn get(&self, t: OceanTrait) -> f64 {
        match t {
            OceanTrait::Openness => self.openness,
            OceanTrait::Conscientiousness => self.conscientiousness,
            OceanTrait::Extraversion => self.extraversion,
            OceanTrait::Agreeableness => self.agreeableness,
            OceanTrait::Neuroticism => self.neuroticism,
        }
    }

    /// Convert to the normalized (0-1) scale, clamping out-of-range input
    pub fn to_normalized(&self) -> NormalizedTraits {
        NormalizedTraits::from_fn(|t| normalize(self.get(t)).clamp(0.0, 1.0))
    }

    /// Whether every axis lies within [1, 5] and is finite
    pub fn is_in_range(&self) -> bool {
        OceanTrait::ALL
            .iter()
            .all(|&t| self.get(t).is_finite() && (RAW_MIN..=RAW_MAX).contains(&self.get(t)))
    }
}

/// Trait scores on the normalized (0-1) scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTraits {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl NormalizedTraits {
    pub fn from_fn(mut f: impl FnMut(OceanTrait) -> f64) -> Self {
        Self {
            openness: f(OceanTrait::Openness),
            conscientiousness: f(OceanTrait::Conscientiousness),
            extraversion: f(OceanTrait::Extraversion),
            agreeableness: f(OceanTrait::Agreeableness),
            neuroticism: f(OceanTrait::Neuroticism),
        }
    }

    pub fn get(&self, t: OceanTrait) -> f64 {
        match t {
            OceanTrait::Openness => self.openness,
            OceanTrait::Conscientiousness => self.conscientiousness,
            OceanTrait::Extraversion => self.extraversion,
            OceanTrait::Agreeableness => self.agreeableness,
            OceanTrait::Neuroticism => self.neuroticism,
        }
    }

    /// Convert back to the raw (1-5) scale
    pub fn to_raw(&self) -> TraitVector {
        TraitVector::from_fn(|t| denormalize(self.get(t)))
    }
}

/// Per-trait measurement uncertainty (population variance of raw scores)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceMap {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl VarianceMap {
    pub fn from_fn(mut f: impl FnMut(OceanTrait) -> f64) -> Self {
        Self {
            openness: f(OceanTrait::Openness),
            conscientiousness: f(OceanTrait::Conscientiousness),
            extraversion: f(OceanTrait::Extraversion),
            agreeableness: f(OceanTrait::Agreeableness),
            neuroticism: f(OceanTrait::Neuroticism),
        }
    }

    /// Same variance on every trait
    pub fn uniform(value: f64) -> Self {
        Self::from_fn(|_| value)
    }

    pub fn get(&self, t: OceanTrait) -> f64 {
        match t {
            OceanTrait::Openness => self.openness,
            OceanTrait::Conscientiousness => self.conscientiousness,
            OceanTrait::Extraversion => self.extraversion,
            OceanTrait::Agreeableness => self.agreeableness,
            OceanTrait::Neuroticism => self.neuroticism,
        }
    }
}

/// Risk tier derived from probability of default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    Low,
    Moderate,
    Elevated,
}

impl RiskRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRating::Low => "low",
            RiskRating::Moderate => "moderate",
            RiskRating::Elevated => "elevated",
        }
    }
}

/// Internal loan decision (visible to administrators only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    PendingApproval,
    ManualReview,
    /// Only reachable through an administrator override
    Declined,
}

impl Decision {
    /// Map the internal decision to the only two values an applicant may see
    pub fn user_facing(&self) -> UserFacingDecision {
        match self {
            Decision::Approved => UserFacingDecision::Approved,
            Decision::PendingApproval | Decision::ManualReview | Decision::Declined => {
                UserFacingDecision::PendingApproval
            }
        }
    }
}

/// Decision shown to the applicant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserFacingDecision {
    Approved,
    PendingApproval,
}
