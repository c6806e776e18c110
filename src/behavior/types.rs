//! Behavioral data types
//!
//! This module defines the telemetry bundle emitted by the delivery game and
//! the scores the extractor derives from it.

use crate::types::NormalizedTraits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nominal length of a gameplay session in seconds
pub const DEFAULT_SESSION_DURATION_SEC: f64 = 60.0;

/// Route taken for one delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    #[serde(default)]
    pub delivery_id: Option<String>,
    /// Distance actually travelled (tiles)
    pub actual_distance: f64,
    /// Shortest possible distance (tiles)
    pub optimal_distance: f64,
}

/// Coins moved into the bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankingEvent {
    pub amount: f64,
    /// Wallet balance just before banking
    #[serde(default)]
    pub balance_before: f64,
    /// Milliseconds since session start
    pub timestamp_ms: f64,
}

/// One cargo-stacking decision (the BART mechanic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoLoad {
    pub crate_count: u32,
    /// Whether the stack toppled and the load was lost
    #[serde(default)]
    pub tipped: bool,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub delivery_id: Option<String>,
}

/// Kind of setback the player suffered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    CargoTipped,
    Theft,
    MissedDelivery,
    Penalty,
    #[serde(other)]
    Other,
}

/// A loss and how much play changed right after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossEvent {
    pub loss_type: LossType,
    #[serde(default)]
    pub timestamp_ms: f64,
    #[serde(default)]
    pub amount_lost: f64,
    /// Behavior change after the loss, pre-normalized by the game (0-1)
    pub behavior_delta: f64,
}

/// A request from another courier to split an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharingEvent {
    #[serde(default = "default_true")]
    pub offered: bool,
    pub accepted: bool,
    /// Share of the reward given away (0-1)
    #[serde(default)]
    pub reward_split: f64,
}

/// A stranded courier the player could help
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpEvent {
    #[serde(default = "default_true")]
    pub help_offered: bool,
    pub accepted: bool,
}

fn default_true() -> bool {
    true
}

fn default_duration() -> f64 {
    DEFAULT_SESSION_DURATION_SEC
}

/// Raw telemetry from one completed gameplay session.
///
/// Every collection defaults to empty and every counter to zero, so a player
/// who never triggered a mechanic still produces a valid bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralSignalBundle {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default = "default_duration")]
    pub duration_sec: f64,
    /// Milliseconds between consecutive taps
    #[serde(default)]
    pub tap_intervals_ms: Vec<f64>,
    #[serde(default)]
    pub path_records: Vec<PathRecord>,
    #[serde(default)]
    pub banking_events: Vec<BankingEvent>,
    #[serde(default)]
    pub cargo_loads: Vec<CargoLoad>,
    #[serde(default)]
    pub loss_events: Vec<LossEvent>,
    #[serde(default)]
    pub sharing_events: Vec<SharingEvent>,
    #[serde(default)]
    pub help_events: Vec<HelpEvent>,
    #[serde(default)]
    pub unique_tiles_visited: u32,
    #[serde(default)]
    pub total_tiles: u32,
    /// Time spent in busy districts
    #[serde(default)]
    pub crowd_time_ms: f64,
    /// Time spent in quiet districts
    #[serde(default)]
    pub quiet_time_ms: f64,
    /// Number of orders carried at once, sampled through the session
    #[serde(default)]
    pub concurrency_samples: Vec<u32>,
}

impl BehavioralSignalBundle {
    /// An empty bundle: every sub-score falls back to its neutral default
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: None,
            duration_sec: DEFAULT_SESSION_DURATION_SEC,
            tap_intervals_ms: Vec::new(),
            path_records: Vec::new(),
            banking_events: Vec::new(),
            cargo_loads: Vec::new(),
            loss_events: Vec::new(),
            sharing_events: Vec::new(),
            help_events: Vec::new(),
            unique_tiles_visited: 0,
            total_tiles: 0,
            crowd_time_ms: 0.0,
            quiet_time_ms: 0.0,
            concurrency_samples: Vec::new(),
        }
    }
}

/// Intermediate statistics behind the trait scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorComponents {
    pub path_efficiency: f64,
    pub banking_regularity: f64,
    pub tap_deliberation: f64,
    pub post_loss_change: f64,
    pub hesitation_pattern: f64,
    pub sharing_accept_rate: f64,
    pub mean_reward_split: f64,
    pub help_accept_rate: f64,
    pub exploration_ratio: f64,
    pub shortcut_usage_ratio: f64,
    pub crowd_time_fraction: f64,
    pub multi_order_fraction: f64,
}

/// Mechanics the player never triggered; their sub-scores used fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQualityFlag {
    /// No completed deliveries with a usable route
    NoDeliveries,
    /// Fewer than two banking events
    SparseBanking,
    /// Fewer than three tap intervals
    FewTaps,
    /// No cargo loads that stayed upright
    NoCargoData,
    /// No sharing or help interactions
    NoSocialEvents,
}

/// Output of the behavioral signal extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralScores {
    pub session_id: String,
    /// Trait-like scores on the normalized (0-1) scale
    pub traits: NormalizedTraits,
    /// BART-style risk-taking index (0-1)
    pub risk_index: f64,
    pub components: BehaviorComponents,
    #[serde(default)]
    pub quality_flags: Vec<SignalQualityFlag>,
}
