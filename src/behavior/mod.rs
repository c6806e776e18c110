//! Phase 2: behavioral signal extraction
//!
//! This module processes gameplay telemetry (taps, routes, banking, cargo
//! stacking, losses and social interactions) and computes normalized trait
//! scores plus a BART-style risk index.
//!
//! Pipeline: Bundle JSON → Adapter → Extractor → BehavioralScores

pub mod adapter;
pub mod features;
pub mod types;

pub use adapter::{parse_bundle, validate_bundle};
pub use features::{compute_bart_score, BehaviorExtractor};
pub use types::{
    BankingEvent, BehaviorComponents, BehavioralScores, BehavioralSignalBundle, CargoLoad,
    HelpEvent, LossEvent, LossType, PathRecord, SharingEvent, SignalQualityFlag,
};
