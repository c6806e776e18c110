//! Telemetry bundle adapter
//!
//! Parses the JSON bundle emitted by the game layer and rejects values the
//! extractor cannot interpret.

use crate::behavior::types::BehavioralSignalBundle;
use crate::error::ScoringError;

/// Parse a behavioral signal bundle JSON string and validate it
pub fn parse_bundle(json: &str) -> Result<BehavioralSignalBundle, ScoringError> {
    let bundle: BehavioralSignalBundle = serde_json::from_str(json).map_err(|e| {
        ScoringError::ParseError(format!("Failed to parse behavioral signal bundle: {}", e))
    })?;
    validate_bundle(&bundle)?;
    Ok(bundle)
}

/// Check that every numeric field is finite and within its domain
pub fn validate_bundle(bundle: &BehavioralSignalBundle) -> Result<(), ScoringError> {
    if bundle.session_id.trim().is_empty() {
        return Err(invalid("session_id must not be empty".to_string()));
    }
    non_negative("duration_sec", bundle.duration_sec)?;
    non_negative("crowd_time_ms", bundle.crowd_time_ms)?;
    non_negative("quiet_time_ms", bundle.quiet_time_ms)?;

    for (i, interval) in bundle.tap_intervals_ms.iter().enumerate() {
        non_negative(&format!("tap_intervals_ms[{i}]"), *interval)?;
    }

    for (i, record) in bundle.path_records.iter().enumerate() {
        non_negative(
            &format!("path_records[{i}].actual_distance"),
            record.actual_distance,
        )?;
        non_negative(
            &format!("path_records[{i}].optimal_distance"),
            record.optimal_distance,
        )?;
    }

    for (i, event) in bundle.banking_events.iter().enumerate() {
        non_negative(&format!("banking_events[{i}].amount"), event.amount)?;
        finite(&format!("banking_events[{i}].balance_before"), event.balance_before)?;
        non_negative(&format!("banking_events[{i}].timestamp_ms"), event.timestamp_ms)?;
    }

    for (i, load) in bundle.cargo_loads.iter().enumerate() {
        finite(&format!("cargo_loads[{i}].reward"), load.reward)?;
    }

    for (i, event) in bundle.loss_events.iter().enumerate() {
        finite(&format!("loss_events[{i}].behavior_delta"), event.behavior_delta)?;
        non_negative(&format!("loss_events[{i}].amount_lost"), event.amount_lost)?;
    }

    for (i, event) in bundle.sharing_events.iter().enumerate() {
        let split = event.reward_split;
        if !split.is_finite() || !(0.0..=1.0).contains(&split) {
            return Err(invalid(format!(
                "sharing_events[{i}].reward_split {split} outside [0, 1]"
            )));
        }
    }

    if bundle.unique_tiles_visited > bundle.total_tiles && bundle.total_tiles > 0 {
        return Err(invalid(format!(
            "unique_tiles_visited {} exceeds total_tiles {}",
            bundle.unique_tiles_visited, bundle.total_tiles
        )));
    }

    Ok(())
}

fn invalid(message: String) -> ScoringError {
    ScoringError::InvalidBundle(message)
}

fn finite(field: &str, value: f64) -> Result<(), ScoringError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be finite, got {value}")))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ScoringError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(invalid(format!("{field} must be non-negative, got {value}")));
    }
    Ok(())
}
