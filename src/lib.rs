//! verigate library
//!
//! Release gate for multi-tier applications. A suite of declarative checks
//! either inspects a bounded region of a source artifact or probes a running
//! HTTP endpoint, and the run collapses into one ordered report and a binary
//! verdict.
//!
//! - Checks are inert data: target, region selector, predicate, severity and
//!   an optional dependency on an earlier check
//! - One generic executor interprets every check
//! - The orchestrator runs checks in declaration order, skips dependants of
//!   failed checks and returns an explicit [`RunReport`]
//!
//! # Example
//!
//! ```no_run
//! use verigate::engine::orchestrator::CancelToken;
//! use verigate::{run_gate, GateConfig};
//!
//! let config = GateConfig::default();
//! let report = run_gate(&config, CancelToken::new()).expect("suite could not be loaded");
//! println!("Checks failed: {}", report.summary().failed);
//! std::process::exit(report.exit_code().into());
//! ```

pub mod checks;
pub mod cli;
pub mod config;
pub mod engine;
pub mod platform;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::checks::Suite;
use crate::engine::orchestrator::{CancelToken, Orchestrator, OrchestratorConfig};
use crate::platform::artifact::{ArtifactLocator, FsReader, TargetContext};
use crate::platform::probe::HttpProbeClient;

pub use crate::checks::{Check, Predicate, RegionSelector, SuiteBuilder, Target};
pub use crate::config::GateConfig;
pub use crate::engine::result::{CheckResult, ResultSummary, RunReport};

/// Whether a failing check blocks the release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A failure is reported as FAIL and turns the verdict red
    #[default]
    Hard,
    /// A failure is reported as WARN only
    Advisory,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hard => write!(f, "hard"),
            Severity::Advisory => write!(f, "advisory"),
        }
    }
}

/// Terminal status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pass,
    Fail,
    Warn,
    Skip,
}

impl Status {
    /// Bracketed tag used by the reporter.
    pub fn tag(&self) -> &'static str {
        match self {
            Status::Pass => "[PASS]",
            Status::Fail => "[FAIL]",
            Status::Warn => "[WARN]",
            Status::Skip => "[SKIP]",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pass => write!(f, "PASS"),
            Status::Fail => write!(f, "FAIL"),
            Status::Warn => write!(f, "WARN"),
            Status::Skip => write!(f, "SKIP"),
        }
    }
}

/// Classification tag carried by every non-passing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ArtifactNotFound,
    InvalidTarget,
    Unreachable,
    Timeout,
    MalformedPayload,
    PredicateMismatch,
    DependencySkipped,
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            FailureKind::ArtifactNotFound => "artifact-not-found",
            FailureKind::InvalidTarget => "invalid-target",
            FailureKind::Unreachable => "unreachable",
            FailureKind::Timeout => "timeout",
            FailureKind::MalformedPayload => "malformed-payload",
            FailureKind::PredicateMismatch => "mismatch",
            FailureKind::DependencySkipped => "dependency-skipped",
            FailureKind::Panicked => "panicked",
        };
        f.write_str(tag)
    }
}

/// Why a single check did not hold.
///
/// These never escape the executor: each one becomes a FAIL, WARN or SKIP
/// result for the check that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("artifact not found: {path}")]
    ArtifactNotFound { path: PathBuf },

    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("unreachable: {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("timeout: {url} did not answer within {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("{message}")]
    PredicateMismatch { message: String },

    #[error("dependency {verb} ({dependency})")]
    DependencySkipped { dependency: String, verb: &'static str },
}

impl CheckError {
    pub fn mismatch(message: impl Into<String>) -> Self {
        CheckError::PredicateMismatch {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            CheckError::ArtifactNotFound { .. } => FailureKind::ArtifactNotFound,
            CheckError::InvalidTarget { .. } => FailureKind::InvalidTarget,
            CheckError::Unreachable { .. } => FailureKind::Unreachable,
            CheckError::Timeout { .. } => FailureKind::Timeout,
            CheckError::MalformedPayload { .. } => FailureKind::MalformedPayload,
            CheckError::PredicateMismatch { .. } => FailureKind::PredicateMismatch,
            CheckError::DependencySkipped { .. } => FailureKind::DependencySkipped,
        }
    }
}

/// Errors that stop a run before any check executes.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("duplicate check id '{0}'")]
    DuplicateCheckId(String),

    #[error("check '{check}' depends on '{dependency}', which is not declared before it")]
    UnknownDependency { check: String, dependency: String },

    #[error("check '{check}' is invalid: {reason}")]
    InvalidCheck { check: String, reason: String },

    #[error("primary artifact not found: {path}")]
    PrimaryArtifactMissing { path: PathBuf },

    #[error("cannot load suite {path}: {message}")]
    SuiteFile { path: PathBuf, message: String },

    #[error("cannot load config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("failed to initialise HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to install signal handler: {0}")]
    SignalHandler(#[source] ctrlc::Error),
}

/// Load the suite selected by the configuration: a TOML suite file when one
/// is configured, the built-in suite otherwise.
pub fn load_suite(config: &GateConfig) -> Result<Suite, GateError> {
    match config.suite_file {
        Some(ref path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                config.root.join(path)
            };
            checks::file::load_suite(&path)
        }
        None => checks::builtin::default_suite(),
    }
}

/// Run the configured suite against the real filesystem and network.
///
/// Returns the finished [`RunReport`]; only suite-level problems (an invalid
/// suite, a missing primary artifact) surface as `Err`. Cancelling `cancel`
/// stops the run before the next check starts; the report then holds the
/// checks that already ran.
pub fn run_gate(config: &GateConfig, cancel: CancelToken) -> Result<RunReport, GateError> {
    let suite = load_suite(config)?;

    let locator = ArtifactLocator::new(TargetContext::from_config(config), config.timeout());
    let probe = HttpProbeClient::new()?;

    let orchestrator = Orchestrator::new(
        OrchestratorConfig {
            parallel: config.parallel,
            max_parallel: config.max_parallel,
        },
        locator,
        Arc::new(FsReader),
        Arc::new(probe),
    )
    .with_cancel_token(cancel);

    orchestrator.run(&suite)
}
