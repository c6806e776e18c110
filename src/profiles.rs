//! Money-attitude profiles
//!
//! A fixed catalog of archetypes, each defined by a partial trait signature on
//! the raw (1-5) scale. Applicants are matched to the nearest archetype using
//! Euclidean distance over only the traits the archetype defines.

use crate::types::{OceanTrait, TraitVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distance at which match confidence reaches zero
const CONFIDENCE_DISTANCE_SCALE: f64 = 6.0;

/// Two closest profiles closer together than this produce a hybrid display name
const HYBRID_NAME_MARGIN: f64 = 1.0;

/// Static catalog entry describing a financial attitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyProfile {
    pub name: String,
    pub description: String,
    /// Partial trait signature (2-5 traits), raw scale
    pub signature: BTreeMap<OceanTrait, f64>,
    /// Signed PD adjustment applied after the risk model
    pub pd_modifier: f64,
    pub risk_interpretation: String,
}

impl MoneyProfile {
    fn new(
        name: &str,
        description: &str,
        signature: &[(OceanTrait, f64)],
        pd_modifier: f64,
        risk_interpretation: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            signature: signature.iter().copied().collect(),
            pd_modifier,
            risk_interpretation: risk_interpretation.to_string(),
        }
    }

    /// Euclidean distance to `traits` over the signature's traits only
    pub fn distance(&self, traits: &TraitVector) -> f64 {
        self.signature
            .iter()
            .map(|(&t, &target)| (traits.get(t) - target).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// The default ten-archetype catalog
pub fn default_catalog() -> Vec<MoneyProfile> {
    use OceanTrait::*;

    vec![
        MoneyProfile::new(
            "Steady Saver",
            "Builds reserves patiently and rarely deviates from a plan.",
            &[(Conscientiousness, 4.5), (Neuroticism, 2.0), (Openness, 2.5)],
            -0.05,
            "Strong repayment discipline; low likelihood of overextension.",
        ),
        MoneyProfile::new(
            "Careful Planner",
            "Budgets ahead, weighs options and keeps obligations visible.",
            &[
                (Conscientiousness, 4.5),
                (Neuroticism, 2.5),
                (Agreeableness, 3.5),
                (Extraversion, 2.5),
            ],
            -0.04,
            "Predictable cash management; repayments tend to be early or on time.",
        ),
        MoneyProfile::new(
            "Bold Builder",
            "Chases growth and is comfortable with calculated bets.",
            &[(Openness, 4.5), (Extraversion, 4.0), (Conscientiousness, 3.5)],
            -0.01,
            "Growth oriented with enough structure to manage leverage.",
        ),
        MoneyProfile::new(
            "Generous Connector",
            "Money flows through relationships; shares readily with others.",
            &[(Agreeableness, 4.5), (Extraversion, 4.0)],
            0.02,
            "Cash may be diverted to community obligations under pressure.",
        ),
        MoneyProfile::new(
            "Anxious Guardian",
            "Worries about money but protects it tightly.",
            &[(Neuroticism, 4.0), (Conscientiousness, 4.0)],
            0.01,
            "Careful, though stress may delay decisions during downturns.",
        ),
        MoneyProfile::new(
            "Impulsive Spender",
            "Acts on opportunities quickly and enjoys spending socially.",
            &[
                (Conscientiousness, 1.8),
                (Openness, 4.0),
                (Extraversion, 4.2),
                (Neuroticism, 3.0),
            ],
            0.06,
            "Elevated risk of cash shortfalls around repayment dates.",
        ),
        MoneyProfile::new(
            "Curious Explorer",
            "Experiments with new ideas, products and income streams.",
            &[(Openness, 4.5), (Conscientiousness, 2.5)],
            0.03,
            "Innovative but may spread funds across too many ventures.",
        ),
        MoneyProfile::new(
            "Cautious Skeptic",
            "Distrusts novelty and prefers proven, conservative choices.",
            &[(Openness, 2.0), (Agreeableness, 2.5), (Neuroticism, 3.0)],
            -0.02,
            "Conservative use of credit; slow to take on new obligations.",
        ),
        MoneyProfile::new(
            "Balanced Pragmatist",
            "Even-tempered and practical across most money decisions.",
            &[
                (Openness, 3.0),
                (Conscientiousness, 3.5),
                (Extraversion, 3.0),
                (Agreeableness, 3.0),
                (Neuroticism, 2.5),
            ],
            -0.01,
            "Typical repayment behavior with no pronounced risk drivers.",
        ),
        MoneyProfile::new(
            "Stressed Juggler",
            "Keeps many commitments in the air and reacts under pressure.",
            &[(Neuroticism, 4.5), (Conscientiousness, 2.0), (Extraversion, 3.5)],
            0.05,
            "Repayment may slip when several obligations collide.",
        ),
    ]
}

/// Result of matching a trait vector against the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileMatch<'a> {
    pub profile: &'a MoneyProfile,
    pub distance: f64,
    /// 1 - distance / 6, clamped to [0, 1]
    pub confidence: f64,
}

/// Nearest-neighbor matcher over a profile catalog
pub struct ProfileMatcher<'a> {
    profiles: &'a [MoneyProfile],
}

impl<'a> ProfileMatcher<'a> {
    pub fn new(profiles: &'a [MoneyProfile]) -> Self {
        Self { profiles }
    }

    /// Find the closest profile; the earliest catalog entry wins ties.
    ///
    /// Returns `None` only for an empty catalog.
    pub fn match_profile(&self, traits: &TraitVector) -> Option<ProfileMatch<'a>> {
        let mut best: Option<ProfileMatch<'a>> = None;

        for profile in self.profiles {
            let distance = profile.distance(traits);
            let closer = best.as_ref().map_or(true, |b| distance < b.distance);
            if closer {
                best = Some(ProfileMatch {
                    profile,
                    distance,
                    confidence: confidence_for(distance),
                });
            }
        }

        best
    }

    /// All profiles ordered by distance (stable: catalog order breaks ties)
    pub fn ranked(&self, traits: &TraitVector) -> Vec<ProfileMatch<'a>> {
        let mut ranked: Vec<ProfileMatch<'a>> = self
            .profiles
            .iter()
            .map(|profile| {
                let distance = profile.distance(traits);
                ProfileMatch {
                    profile,
                    distance,
                    confidence: confidence_for(distance),
                }
            })
            .collect();
        ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        ranked
    }

    /// Display name, hybridized when the two closest profiles are near each other.
    ///
    /// Purely cosmetic; the PD modifier always comes from [`Self::match_profile`].
    pub fn blended_name(&self, traits: &TraitVector) -> Option<String> {
        let ranked = self.ranked(traits);
        let closest = ranked.first()?;

        match ranked.get(1) {
            Some(second) if second.distance - closest.distance < HYBRID_NAME_MARGIN => {
                Some(hybrid_name(&closest.profile.name, &second.profile.name))
            }
            _ => Some(closest.profile.name.clone()),
        }
    }
}

fn confidence_for(distance: f64) -> f64 {
    (1.0 - distance / CONFIDENCE_DISTANCE_SCALE).clamp(0.0, 1.0)
}

/// First word of `closer` joined with the second word of `second`
/// (or its first word when it has only one)
fn hybrid_name(closer: &str, second: &str) -> String {
    let lead = closer.split_whitespace().next().unwrap_or(closer);
    let mut words = second.split_whitespace();
    let first = words.next().unwrap_or(second);
    let tail = words.next().unwrap_or(first);
    format!("{lead} {tail}")
}
