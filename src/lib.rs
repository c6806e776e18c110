//! Mindset Credit - deterministic credit scoring from psychometric and gameplay signals
//!
//! The pipeline turns an adaptively collected self-report questionnaire and a
//! short gameplay telemetry session into a probability of default, a risk tier,
//! a money-attitude profile, a consistency signal and a loan decision:
//! self-report aggregation → behavioral extraction → blending → risk model →
//! profile matching → loan decision.
//!
//! ## Modules
//!
//! - **Questionnaire**: candidate intake, question selection, reaction-time
//!   adjustment and trait aggregation (Phase 1)
//! - **Behavior**: telemetry bundle parsing and behavioral trait extraction (Phase 2)
//! - **Scoring**: blending, risk model, profile matching and loan decisions
//! - **Session**: explicit assessment lifecycle with validated transitions

pub mod assessment;
pub mod behavior;
pub mod blending;
pub mod config;
pub mod decision;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod profiles;
pub mod questionnaire;
pub mod risk;
pub mod session;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use assessment::{AdminOverride, Assessment, LoanRecommendation};
pub use config::ScoringConfig;
pub use decision::ApplicantResponse;
pub use encoder::{AdminReport, ReportEncoder};
pub use error::ScoringError;
pub use pipeline::{applicant_response_json, score_full_json, score_phase1_json, ScoringContext};
pub use session::{AssessmentSession, SessionStatus};
pub use types::{Decision, OceanTrait, RiskRating, TraitVector, UserFacingDecision};

/// Engine version embedded in every admin report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for admin reports
pub const PRODUCER_NAME: &str = "mindset-credit";
