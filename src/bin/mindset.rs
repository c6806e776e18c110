//! Mindset CLI - Command-line interface for Mindset Credit
//!
//! Commands:
//! - phase1: Score a self-report history
//! - assess: Score self-report plus gameplay telemetry
//! - behavior: Extract behavioral scores from a telemetry bundle
//! - next-question: Pick the next question from a candidate batch
//! - profiles: List the money-profile catalog
//! - doctor: Diagnose configuration health

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mindset_credit::behavior::{parse_bundle, BehaviorExtractor};
use mindset_credit::encoder::{ReportEncoder, ReportInput};
use mindset_credit::questionnaire::{
    highest_variance_trait, parse_candidate_batch, parse_responses, CandidateQuestion,
};
use mindset_credit::types::{OceanTrait, VarianceMap};
use mindset_credit::{
    AssessmentSession, ScoringConfig, ScoringContext, ScoringError, SessionStatus, ENGINE_VERSION,
    PRODUCER_NAME,
};

/// Mindset - psychometric credit scoring for small-business loans
#[derive(Parser)]
#[command(name = "mindset")]
#[command(author = "Mindset Credit Engineering")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score questionnaire and gameplay signals into loans", long_about = None)]
struct Cli {
    /// Scoring configuration JSON (defaults when omitted)
    #[arg(long, global = true, env = "MINDSET_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a self-report history (Phase 1 only)
    Phase1 {
        /// Responses JSON array (use - for stdin)
        #[arg(short, long)]
        responses: PathBuf,
    },

    /// Score self-report and gameplay telemetry together
    Assess {
        /// Responses JSON array
        #[arg(short, long)]
        responses: PathBuf,

        /// Behavioral signal bundle JSON
        #[arg(short, long)]
        bundle: PathBuf,

        /// Print only what the applicant would see
        #[arg(long)]
        applicant: bool,
    },

    /// Extract behavioral scores from a telemetry bundle
    Behavior {
        /// Behavioral signal bundle JSON (use - for stdin)
        #[arg(short, long)]
        bundle: PathBuf,
    },

    /// Pick the next question from a generator batch
    NextQuestion {
        /// Responses recorded so far
        #[arg(short, long)]
        responses: PathBuf,

        /// Candidate batch JSON array
        #[arg(short, long)]
        candidates: PathBuf,
    },

    /// List the money-profile catalog
    Profiles,

    /// Diagnose configuration health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        let err = CliError::from(e);
        eprintln!(
            "{}",
            serde_json::to_string(&err).unwrap_or_else(|_| err.message.clone())
        );
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let err = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&err).unwrap_or_else(|_| err.message.clone())
            );
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr subscriber; RUST_LOG wins over `--log-level`
fn init_tracing(log_level: &str) -> Result<(), MindsetCliError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level).map_err(|e| {
            MindsetCliError::Telemetry(format!("invalid log level/filter '{log_level}': {e}"))
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(|e| MindsetCliError::Telemetry(e.to_string()))
}

fn run(cli: Cli) -> Result<(), MindsetCliError> {
    if let Commands::Doctor { json } = cli.command {
        return cmd_doctor(cli.config.as_deref(), json);
    }

    let context = load_context(cli.config.as_deref())?;
    let pretty = cli.pretty;

    match cli.command {
        Commands::Phase1 { responses } => cmd_phase1(&context, &responses, pretty),
        Commands::Assess {
            responses,
            bundle,
            applicant,
        } => cmd_assess(&context, &responses, &bundle, applicant, pretty),
        Commands::Behavior { bundle } => cmd_behavior(&context, &bundle, pretty),
        Commands::NextQuestion {
            responses,
            candidates,
        } => cmd_next_question(&context, &responses, &candidates, pretty),
        Commands::Profiles => emit(&context.config().profiles, pretty),
        Commands::Doctor { .. } => Ok(()),
    }
}

fn load_context(path: Option<&Path>) -> Result<ScoringContext, MindsetCliError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading scoring configuration");
            let json = fs::read_to_string(path)?;
            Ok(ScoringContext::new(ScoringConfig::from_json(&json)?)?)
        }
        None => Ok(ScoringContext::default()),
    }
}

fn read_input(path: &Path) -> Result<String, MindsetCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<(), MindsetCliError> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

fn cmd_phase1(
    context: &ScoringContext,
    responses: &Path,
    pretty: bool,
) -> Result<(), MindsetCliError> {
    let responses = parse_responses(&read_input(responses)?)?;
    context.require_complete_history(&responses)?;
    let (assessment, recommendation) = context.score_phase1(&responses, chrono::Utc::now())?;

    let report = ReportEncoder::new().encode(&ReportInput {
        status: SessionStatus::Phase1Complete,
        assessment: &assessment,
        recommendation: &recommendation,
        behavioral: None,
        bundle: None,
    });
    emit(&report, pretty)
}

fn cmd_assess(
    context: &ScoringContext,
    responses: &Path,
    bundle: &Path,
    applicant: bool,
    pretty: bool,
) -> Result<(), MindsetCliError> {
    let responses = parse_responses(&read_input(responses)?)?;
    context.require_complete_history(&responses)?;
    let bundle = parse_bundle(&read_input(bundle)?)?;
    let now = chrono::Utc::now();

    let (phase1, _) = context.score_phase1(&responses, now)?;
    let result = context.score_phase2(Some(&phase1), &bundle, now)?;

    if applicant {
        return emit(&result.assessment.applicant_response(), pretty);
    }

    let report = ReportEncoder::new().encode(&ReportInput {
        status: SessionStatus::Phase2Complete,
        assessment: &result.assessment,
        recommendation: &result.recommendation,
        behavioral: Some(&result.behavioral),
        bundle: Some(&bundle),
    });
    emit(&report, pretty)
}

fn cmd_behavior(
    context: &ScoringContext,
    bundle: &Path,
    pretty: bool,
) -> Result<(), MindsetCliError> {
    let bundle = parse_bundle(&read_input(bundle)?)?;
    let scores = BehaviorExtractor::extract(&bundle, &context.config().behavior);
    emit(&scores, pretty)
}

#[derive(Serialize)]
struct NextQuestionReport<'a> {
    index: Option<usize>,
    question: Option<&'a CandidateQuestion>,
    responses_recorded: usize,
    stopping_rule_met: bool,
    focus_trait: OceanTrait,
    variances: VarianceMap,
}

fn cmd_next_question(
    context: &ScoringContext,
    responses: &Path,
    candidates: &Path,
    pretty: bool,
) -> Result<(), MindsetCliError> {
    let responses = parse_responses(&read_input(responses)?)?;
    let candidates =
        parse_candidate_batch(&read_input(candidates)?, &context.config().questionnaire)?;

    let session_id = responses
        .first()
        .map_or_else(|| "cli".to_string(), |r| r.session_id.clone());
    let mut session = AssessmentSession::new(session_id);
    for response in responses {
        session.record_response(response)?;
    }

    let stopping_rule_met = session.is_complete(context);
    let index = if stopping_rule_met {
        None
    } else {
        Some(session.next_question(context, &candidates)?)
    };
    debug!(?index, stopping_rule_met, "next question evaluated");

    let variances = session.variances();
    emit(
        &NextQuestionReport {
            index,
            question: index.and_then(|i| candidates.get(i)),
            responses_recorded: session.responses().len(),
            stopping_rule_met,
            focus_trait: highest_variance_trait(&variances),
            variances,
        },
        pretty,
    )
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), MindsetCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    let loaded = match config {
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Config file {} does not exist", path.display()),
            });
            None
        }
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => match ScoringConfig::from_json(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    });
                    None
                }
            },
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                });
                None
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "No config file given, using built-in defaults".to_string(),
            });
            Some(ScoringConfig::default())
        }
    };

    if let Some(config) = loaded {
        match config.validate() {
            Ok(()) => checks.push(DoctorCheck {
                name: "config_validation".to_string(),
                status: CheckStatus::Ok,
                message: "All weight tables, bands and terms are consistent".to_string(),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "config_validation".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }),
        }

        let profile_count = config.profiles.len();
        checks.push(DoctorCheck {
            name: "profile_catalog".to_string(),
            status: if profile_count == 10 {
                CheckStatus::Ok
            } else {
                CheckStatus::Warning
            },
            message: format!("{} money profiles loaded", profile_count),
        });

        let q = &config.questionnaire;
        checks.push(DoctorCheck {
            name: "questionnaire".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "{}-{} questions, variance threshold {}",
                q.min_questions, q.max_questions, q.variance_threshold
            ),
        });
    }

    // Check stdin is available (for piped input)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass files explicitly)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe ('-' inputs ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Mindset Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MindsetCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum MindsetCliError {
    Io(io::Error),
    Scoring(ScoringError),
    Json(serde_json::Error),
    Telemetry(String),
    DoctorFailed,
}

impl From<io::Error> for MindsetCliError {
    fn from(e: io::Error) -> Self {
        MindsetCliError::Io(e)
    }
}

impl From<ScoringError> for MindsetCliError {
    fn from(e: ScoringError) -> Self {
        MindsetCliError::Scoring(e)
    }
}

impl From<serde_json::Error> for MindsetCliError {
    fn from(e: serde_json::Error) -> Self {
        MindsetCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        Self {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<MindsetCliError> for CliError {
    fn from(e: MindsetCliError) -> Self {
        match e {
            MindsetCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions")
            }
            MindsetCliError::Json(e) => {
                CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax")
            }
            MindsetCliError::Telemetry(msg) => {
                CliError::new("LOGGING_ERROR", msg, "Check --log-level or RUST_LOG")
            }
            MindsetCliError::DoctorFailed => CliError::new(
                "DOCTOR_FAILED",
                "One or more health checks failed".to_string(),
                "Review the doctor report for details",
            ),
            MindsetCliError::Scoring(e) => {
                let message = e.to_string();
                match e {
                    ScoringError::ParseError(_) | ScoringError::JsonError(_) => {
                        CliError::new("PARSE_ERROR", message, "Check the input JSON shape")
                    }
                    ScoringError::InvalidInput(_) => {
                        CliError::new("INVALID_INPUT", message, "Check the responses file")
                    }
                    ScoringError::InvalidCandidateBatch(_) => CliError::new(
                        "INVALID_CANDIDATES",
                        message,
                        "A batch holds 1-3 candidates with option scores in [1, 5]",
                    ),
                    ScoringError::InvalidBundle(_) => CliError::new(
                        "INVALID_BUNDLE",
                        message,
                        "Check the telemetry bundle values",
                    ),
                    ScoringError::InvalidConfig(_) => CliError::new(
                        "INVALID_CONFIG",
                        message,
                        "Run 'mindset doctor --config <file>' for details",
                    ),
                    ScoringError::PreconditionViolation(_)
                    | ScoringError::InvalidTransition { .. } => CliError::new(
                        "SEQUENCE_ERROR",
                        message,
                        "Complete the question history, then score Phase 1 before Phase 2",
                    ),
                    ScoringError::OutOfOrderResponse { .. }
                    | ScoringError::SessionMismatch { .. } => CliError::new(
                        "HISTORY_ERROR",
                        message,
                        "Responses must come from one session in answer order",
                    ),
                }
            }
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
