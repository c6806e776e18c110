//! Behavioral signal extraction
//!
//! Reduces a gameplay telemetry bundle to five normalized trait scores and a
//! BART-style risk index. Every sub-score is a pure function of the bundle,
//! clamped to [0, 1], with a fixed neutral fallback for missing data.

use crate::behavior::types::{
    BankingEvent, BehaviorComponents, BehavioralScores, BehavioralSignalBundle, CargoLoad,
    HelpEvent, LossEvent, PathRecord, SharingEvent, SignalQualityFlag,
};
use crate::config::{BehaviorConfig, TapBand};
use crate::types::NormalizedTraits;
use tracing::debug;

/// Routes shorter than this fraction of the optimal distance count as shortcuts
const SHORTCUT_RATIO: f64 = 0.95;

/// Feature extractor for gameplay telemetry
pub struct BehaviorExtractor;

impl BehaviorExtractor {
    /// Extract trait scores from a completed session
    pub fn extract(bundle: &BehavioralSignalBundle, config: &BehaviorConfig) -> BehavioralScores {
        let risk_index = compute_bart_score(&bundle.cargo_loads, config.max_cargo);

        // Conscientiousness inputs
        let path_efficiency = compute_path_efficiency(&bundle.path_records);
        let banking_regularity = compute_banking_regularity(&bundle.banking_events);
        let tap_deliberation = compute_tap_deliberation(
            &bundle.tap_intervals_ms,
            &config.tap_bands,
            config.tap_slow_score,
        );

        // Neuroticism inputs
        let post_loss_change = compute_post_loss_change(&bundle.loss_events);
        let hesitation_pattern = compute_hesitation_pattern(&bundle.tap_intervals_ms);

        // Agreeableness inputs
        let sharing_accept_rate = compute_sharing_accept_rate(&bundle.sharing_events);
        let mean_reward_split = compute_mean_reward_split(&bundle.sharing_events);
        let help_accept_rate = compute_help_accept_rate(&bundle.help_events);

        // Openness inputs
        let exploration_ratio =
            compute_exploration_ratio(bundle.unique_tiles_visited, bundle.total_tiles);
        let shortcut_usage_ratio = compute_shortcut_usage(&bundle.path_records);

        // Extraversion inputs
        let crowd_time_fraction =
            compute_crowd_time_fraction(bundle.crowd_time_ms, bundle.quiet_time_ms);
        let multi_order_fraction = compute_multi_order_fraction(&bundle.concurrency_samples);

        let traits = NormalizedTraits {
            openness: compute_openness(exploration_ratio, shortcut_usage_ratio, risk_index),
            conscientiousness: compute_conscientiousness(
                path_efficiency,
                banking_regularity,
                tap_deliberation,
            ),
            extraversion: compute_extraversion(crowd_time_fraction, multi_order_fraction),
            agreeableness: compute_agreeableness(
                sharing_accept_rate,
                mean_reward_split,
                help_accept_rate,
            ),
            neuroticism: compute_neuroticism(post_loss_change, hesitation_pattern, risk_index),
        };

        debug!(
            session_id = %bundle.session_id,
            risk_index,
            o = traits.openness,
            c = traits.conscientiousness,
            e = traits.extraversion,
            a = traits.agreeableness,
            n = traits.neuroticism,
            "extracted behavioral scores"
        );

        BehavioralScores {
            session_id: bundle.session_id.clone(),
            traits,
            risk_index,
            components: BehaviorComponents {
                path_efficiency,
                banking_regularity,
                tap_deliberation,
                post_loss_change,
                hesitation_pattern,
                sharing_accept_rate,
                mean_reward_split,
                help_accept_rate,
                exploration_ratio,
                shortcut_usage_ratio,
                crowd_time_fraction,
                multi_order_fraction,
            },
            quality_flags: quality_flags(bundle),
        }
    }
}

/// Conscientiousness = 0.40 * path + 0.35 * banking + 0.25 * tap deliberation
fn compute_conscientiousness(path: f64, banking: f64, deliberation: f64) -> f64 {
    (0.40 * path + 0.35 * banking + 0.25 * deliberation).clamp(0.0, 1.0)
}

/// Neuroticism = 0.40 * post-loss change + 0.30 * hesitation + 0.30 * (1 - risk)
fn compute_neuroticism(post_loss: f64, hesitation: f64, risk_index: f64) -> f64 {
    (0.40 * post_loss + 0.30 * hesitation + 0.30 * (1.0 - risk_index)).clamp(0.0, 1.0)
}

/// Agreeableness = 0.40 * sharing accept + 0.30 * reward split + 0.30 * help accept
fn compute_agreeableness(sharing: f64, split: f64, help: f64) -> f64 {
    (0.40 * sharing + 0.30 * split + 0.30 * help).clamp(0.0, 1.0)
}

/// Openness = 0.35 * exploration + 0.30 * shortcuts + 0.35 * risk
fn compute_openness(exploration: f64, shortcuts: f64, risk_index: f64) -> f64 {
    (0.35 * exploration + 0.30 * shortcuts + 0.35 * risk_index).clamp(0.0, 1.0)
}

/// Extraversion = 0.55 * crowd time + 0.45 * multi-order
fn compute_extraversion(crowd: f64, multi_order: f64) -> f64 {
    (0.55 * crowd + 0.45 * multi_order).clamp(0.0, 1.0)
}

/// BART-style risk index
///
/// Mean crate count over loads that did not tip, divided by `max_cargo`.
/// Without any upright load the index is neutral (0.5), not risk-averse.
pub fn compute_bart_score(loads: &[CargoLoad], max_cargo: f64) -> f64 {
    let upright: Vec<f64> = loads
        .iter()
        .filter(|l| !l.tipped)
        .map(|l| l.crate_count as f64)
        .collect();

    if upright.is_empty() || max_cargo <= 0.0 {
        return 0.5;
    }
    let mean = upright.iter().sum::<f64>() / upright.len() as f64;
    (mean / max_cargo).clamp(0.0, 1.0)
}

/// Mean of `min(1, optimal / actual)` over deliveries; 0.5 without deliveries
fn compute_path_efficiency(records: &[PathRecord]) -> f64 {
    let ratios: Vec<f64> = records
        .iter()
        .filter(|r| r.actual_distance > 0.0)
        .map(|r| (r.optimal_distance / r.actual_distance).min(1.0))
        .collect();

    if ratios.is_empty() {
        return 0.5;
    }
    (ratios.iter().sum::<f64>() / ratios.len() as f64).clamp(0.0, 1.0)
}

/// `1 - CV(inter-banking intervals) / 2`
///
/// Zero events score 0.2 (never banked), one event scores 0.5.
fn compute_banking_regularity(events: &[BankingEvent]) -> f64 {
    match events.len() {
        0 => return 0.2,
        1 => return 0.5,
        _ => {}
    }

    let mut timestamps: Vec<f64> = events.iter().map(|e| e.timestamp_ms).collect();
    timestamps.sort_by(f64::total_cmp);
    let intervals: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();

    match coefficient_of_variation(&intervals) {
        Some(cv) => (1.0 - cv / 2.0).clamp(0.0, 1.0),
        None => 0.5,
    }
}

/// Step function of mean tap interval; peaks in the middle band
fn compute_tap_deliberation(intervals: &[f64], bands: &[TapBand], slow_score: f64) -> f64 {
    if intervals.is_empty() {
        return 0.5;
    }
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    bands
        .iter()
        .find(|band| mean < band.below_ms)
        .map_or(slow_score, |band| band.score)
        .clamp(0.0, 1.0)
}

/// Mean absolute behavior delta after losses; 0.3 without losses
fn compute_post_loss_change(events: &[LossEvent]) -> f64 {
    if events.is_empty() {
        return 0.3;
    }
    let total: f64 = events.iter().map(|e| e.behavior_delta.abs()).sum();
    (total / events.len() as f64).clamp(0.0, 1.0)
}

/// `CV(tap intervals) / 1.5`; 0.5 with fewer than three samples
fn compute_hesitation_pattern(intervals: &[f64]) -> f64 {
    if intervals.len() < 3 {
        return 0.5;
    }
    match coefficient_of_variation(intervals) {
        Some(cv) => (cv / 1.5).clamp(0.0, 1.0),
        None => 0.5,
    }
}

/// Accepted and offered over offered; 0.5 when nothing was offered
fn compute_sharing_accept_rate(events: &[SharingEvent]) -> f64 {
    let offered = events.iter().filter(|e| e.offered).count();
    if offered == 0 {
        return 0.5;
    }
    let accepted = events.iter().filter(|e| e.offered && e.accepted).count();
    (accepted as f64 / offered as f64).clamp(0.0, 1.0)
}

/// Mean reward split over accepted shares; 0.5 when none were accepted
fn compute_mean_reward_split(events: &[SharingEvent]) -> f64 {
    let splits: Vec<f64> = events
        .iter()
        .filter(|e| e.offered && e.accepted)
        .map(|e| e.reward_split)
        .collect();
    if splits.is_empty() {
        return 0.5;
    }
    (splits.iter().sum::<f64>() / splits.len() as f64).clamp(0.0, 1.0)
}

/// Accepted over offered, counting only events where help was offered
fn compute_help_accept_rate(events: &[HelpEvent]) -> f64 {
    let offered: Vec<&HelpEvent> = events.iter().filter(|e| e.help_offered).collect();
    if offered.is_empty() {
        return 0.5;
    }
    let accepted = offered.iter().filter(|e| e.accepted).count();
    (accepted as f64 / offered.len() as f64).clamp(0.0, 1.0)
}

fn compute_exploration_ratio(unique_tiles: u32, total_tiles: u32) -> f64 {
    if total_tiles == 0 {
        return 0.0;
    }
    (unique_tiles as f64 / total_tiles as f64).clamp(0.0, 1.0)
}

/// Fraction of deliveries where the route beat 95% of the optimal distance
fn compute_shortcut_usage(records: &[PathRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let shortcuts = records
        .iter()
        .filter(|r| r.actual_distance < SHORTCUT_RATIO * r.optimal_distance)
        .count();
    (shortcuts as f64 / records.len() as f64).clamp(0.0, 1.0)
}

fn compute_crowd_time_fraction(crowd_ms: f64, quiet_ms: f64) -> f64 {
    let total = crowd_ms + quiet_ms;
    if total <= 0.0 {
        return 0.5;
    }
    (crowd_ms / total).clamp(0.0, 1.0)
}

/// Fraction of concurrency samples with more than one active order
fn compute_multi_order_fraction(samples: &[u32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let multi = samples.iter().filter(|&&s| s > 1).count();
    (multi as f64 / samples.len() as f64).clamp(0.0, 1.0)
}

/// Population standard deviation over mean; `None` for empty or zero-mean input
fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean)
}

fn quality_flags(bundle: &BehavioralSignalBundle) -> Vec<SignalQualityFlag> {
    let mut flags = Vec::new();
    if !bundle.path_records.iter().any(|r| r.actual_distance > 0.0) {
        flags.push(SignalQualityFlag::NoDeliveries);
    }
    if bundle.banking_events.len() < 2 {
        flags.push(SignalQualityFlag::SparseBanking);
    }
    if bundle.tap_intervals_ms.len() < 3 {
        flags.push(SignalQualityFlag::FewTaps);
    }
    if !bundle.cargo_loads.iter().any(|l| !l.tipped) {
        flags.push(SignalQualityFlag::NoCargoData);
    }
    if bundle.sharing_events.is_empty() && bundle.help_events.is_empty() {
        flags.push(SignalQualityFlag::NoSocialEvents);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::types::LossType;
    use crate::types::OceanTrait;

    fn make_test_deposit(amount: f64, balance_before: f64, timestamp_ms: f64) -> BankingEvent {
        BankingEvent {
            amount,
            balance_before,
            timestamp_ms,
        }
    }

    fn make_test_load(crate_count: u32, tipped: bool, reward: f64) -> CargoLoad {
        CargoLoad {
            crate_count,
            tipped,
            reward,
            delivery_id: None,
        }
    }

    fn make_test_bundle() -> BehavioralSignalBundle {
        let mut bundle = BehavioralSignalBundle::empty("game-1");
        bundle.tap_intervals_ms = vec![500.0, 600.0, 550.0, 650.0];
        bundle.path_records = vec![
            PathRecord {
                delivery_id: Some("d1".to_string()),
                actual_distance: 10.0,
                optimal_distance: 10.0,
            },
            PathRecord {
                delivery_id: Some("d2".to_string()),
                actual_distance: 20.0,
                optimal_distance: 10.0,
            },
        ];
        bundle.banking_events = vec![
            make_test_deposit(10.0, 12.0, 10_000.0),
            make_test_deposit(15.0, 20.0, 20_000.0),
            make_test_deposit(12.0, 14.0, 30_000.0),
        ];
        bundle.cargo_loads = vec![
            make_test_load(4, false, 20.0),
            make_test_load(6, false, 30.0),
            make_test_load(7, true, 0.0),
        ];
        bundle.loss_events = vec![LossEvent {
            loss_type: LossType::CargoTipped,
            timestamp_ms: 35_000.0,
            amount_lost: 35.0,
            behavior_delta: -0.4,
        }];
        bundle.sharing_events = vec![
            SharingEvent {
                offered: true,
                accepted: true,
                reward_split: 0.4,
            },
            SharingEvent {
                offered: true,
                accepted: false,
                reward_split: 0.0,
            },
        ];
        bundle.help_events = vec![
            HelpEvent {
                help_offered: true,
                accepted: true,
            },
            HelpEvent {
                help_offered: false,
                accepted: true,
            },
        ];
        bundle.unique_tiles_visited = 30;
        bundle.total_tiles = 60;
        bundle.crowd_time_ms = 20_000.0;
        bundle.quiet_time_ms = 30_000.0;
        bundle.concurrency_samples = vec![1, 2, 2, 1];
        bundle
    }

    #[test]
    fn test_bart_score_empty_is_neutral() {
        assert_eq!(compute_bart_score(&[], 7.0), 0.5);

        let all_tipped = vec![CargoLoad {
            crate_count: 7,
            tipped: true,
            reward: 0.0,
            delivery_id: None,
        }];
        assert_eq!(compute_bart_score(&all_tipped, 7.0), 0.5);
    }

    #[test]
    fn test_bart_score_ignores_tipped_loads() {
        let bundle = make_test_bundle();
        // (4 + 6) / 2 = 5 -> 5 / 7
        let score = compute_bart_score(&bundle.cargo_loads, 7.0);
        assert!((score - 5.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_banking_regularity_sparse_defaults() {
        assert_eq!(compute_banking_regularity(&[]), 0.2);
        let one = [make_test_deposit(5.0, 5.0, 1_000.0)];
        assert_eq!(compute_banking_regularity(&one), 0.5);
    }

    #[test]
    fn test_banking_regularity_even_intervals() {
        let bundle = make_test_bundle();
        assert!((compute_banking_regularity(&bundle.banking_events) - 1.0).abs() < 1e-12);

        // Same timestamp twice: zero mean interval falls back to neutral
        let simultaneous = [
            make_test_deposit(5.0, 5.0, 1_000.0),
            make_test_deposit(5.0, 0.0, 1_000.0),
        ];
        assert_eq!(compute_banking_regularity(&simultaneous), 0.5);
    }

    #[test]
    fn test_banking_regularity_irregular_intervals() {
        // Intervals 1000 and 9000: mean 5000, std 4000, CV 0.8 -> 1 - 0.4
        let events = [
            make_test_deposit(1.0, 1.0, 0.0),
            make_test_deposit(1.0, 1.0, 1_000.0),
            make_test_deposit(1.0, 1.0, 10_000.0),
        ];
        assert!((compute_banking_regularity(&events) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_tap_deliberation_bands() {
        let config = BehaviorConfig::default();
        let score = |mean: f64| {
            compute_tap_deliberation(&[mean], &config.tap_bands, config.tap_slow_score)
        };
        assert_eq!(score(150.0), 0.2);
        assert_eq!(score(200.0), 0.5);
        assert_eq!(score(600.0), 0.9);
        assert_eq!(score(1_000.0), 0.7);
        assert_eq!(score(1_200.0), 0.4);
        assert_eq!(
            compute_tap_deliberation(&[], &config.tap_bands, config.tap_slow_score),
            0.5
        );
    }

    #[test]
    fn test_hesitation_pattern() {
        assert_eq!(compute_hesitation_pattern(&[100.0, 900.0]), 0.5);
        assert_eq!(compute_hesitation_pattern(&[300.0, 300.0, 300.0]), 0.0);
        assert_eq!(compute_hesitation_pattern(&[0.0, 0.0, 0.0]), 0.5);
        // Very erratic tapping saturates
        assert_eq!(compute_hesitation_pattern(&[10.0, 10.0, 10.0, 5_000.0]), 1.0);
    }

    #[test]
    fn test_path_efficiency_and_shortcuts() {
        let bundle = make_test_bundle();
        // (1.0 + 0.5) / 2
        assert!((compute_path_efficiency(&bundle.path_records) - 0.75).abs() < 1e-12);
        assert_eq!(compute_path_efficiency(&[]), 0.5);

        let shortcut = [PathRecord {
            delivery_id: None,
            actual_distance: 8.0,
            optimal_distance: 10.0,
        }];
        assert_eq!(compute_shortcut_usage(&shortcut), 1.0);
        assert_eq!(compute_path_efficiency(&shortcut), 1.0);
        assert_eq!(compute_shortcut_usage(&bundle.path_records), 0.0);
        assert_eq!(compute_shortcut_usage(&[]), 0.0);
    }

    #[test]
    fn test_social_rates() {
        let bundle = make_test_bundle();
        assert_eq!(compute_sharing_accept_rate(&bundle.sharing_events), 0.5);
        assert!((compute_mean_reward_split(&bundle.sharing_events) - 0.4).abs() < 1e-12);
        // The event without an offer is ignored
        assert_eq!(compute_help_accept_rate(&bundle.help_events), 1.0);

        assert_eq!(compute_sharing_accept_rate(&[]), 0.5);
        assert_eq!(compute_mean_reward_split(&[]), 0.5);
        assert_eq!(compute_help_accept_rate(&[]), 0.5);
    }

    #[test]
    fn test_extraversion_inputs() {
        assert_eq!(compute_crowd_time_fraction(0.0, 0.0), 0.5);
        assert!((compute_crowd_time_fraction(20_000.0, 30_000.0) - 0.4).abs() < 1e-12);
        assert_eq!(compute_multi_order_fraction(&[1, 2, 3, 1]), 0.5);
        assert_eq!(compute_multi_order_fraction(&[]), 0.0);
    }

    #[test]
    fn test_exploration_ratio() {
        assert_eq!(compute_exploration_ratio(30, 60), 0.5);
        assert_eq!(compute_exploration_ratio(5, 0), 0.0);
    }

    #[test]
    fn test_post_loss_change_uses_absolute_delta() {
        let bundle = make_test_bundle();
        assert!((compute_post_loss_change(&bundle.loss_events) - 0.4).abs() < 1e-12);
        assert_eq!(compute_post_loss_change(&[]), 0.3);
    }

    #[test]
    fn test_full_extraction() {
        let bundle = make_test_bundle();
        let scores = BehaviorExtractor::extract(&bundle, &BehaviorConfig::default());
        let risk = 5.0 / 7.0;

        // path 0.75, banking 1.0, mean tap 575ms -> 0.9
        let expected_c = 0.40 * 0.75 + 0.35 * 1.0 + 0.25 * 0.9;
        assert!((scores.traits.conscientiousness - expected_c).abs() < 1e-9);

        let expected_o = 0.35 * 0.5 + 0.30 * 0.0 + 0.35 * risk;
        assert!((scores.traits.openness - expected_o).abs() < 1e-9);

        let expected_e = 0.55 * 0.4 + 0.45 * 0.5;
        assert!((scores.traits.extraversion - expected_e).abs() < 1e-9);

        let expected_a = 0.40 * 0.5 + 0.30 * 0.4 + 0.30 * 1.0;
        assert!((scores.traits.agreeableness - expected_a).abs() < 1e-9);

        let hesitation = compute_hesitation_pattern(&bundle.tap_intervals_ms);
        let expected_n = 0.40 * 0.4 + 0.30 * hesitation + 0.30 * (1.0 - risk);
        assert!((scores.traits.neuroticism - expected_n).abs() < 1e-9);

        assert!((scores.risk_index - risk).abs() < 1e-12);
        assert!(scores.quality_flags.is_empty());
    }

    #[test]
    fn test_empty_bundle_stays_neutral_and_finite() {
        let bundle = BehavioralSignalBundle::empty("quiet-player");
        let scores = BehaviorExtractor::extract(&bundle, &BehaviorConfig::default());

        for t in OceanTrait::ALL {
            let value = scores.traits.get(t);
            assert!(value.is_finite());
            assert!((0.0..=1.0).contains(&value));
        }
        assert_eq!(scores.risk_index, 0.5);
        assert_eq!(scores.components.banking_regularity, 0.2);
        assert!(scores.quality_flags.contains(&SignalQualityFlag::NoCargoData));
        assert!(scores.quality_flags.contains(&SignalQualityFlag::NoSocialEvents));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let bundle = make_test_bundle();
        let config = BehaviorConfig::default();
        let first = BehaviorExtractor::extract(&bundle, &config);
        let second = BehaviorExtractor::extract(&bundle, &config);
        assert_eq!(first, second);
    }
}
