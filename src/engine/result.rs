//! Result collection.
//!
//! Every check produces exactly one [`CheckResult`], recorded in declaration
//! order by a [`ResultCollector`] that the orchestrator owns for the run. The
//! finished [`RunReport`] is the only thing a run hands back.

use crate::checks::Check;
use crate::platform::artifact::TargetContext;
use crate::{CheckError, FailureKind, Status};

/// What executing (or skipping) one check produced, before it is sequenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub message: String,
    pub kind: Option<FailureKind>,
    pub duration_ms: u64,
}

impl Outcome {
    pub fn pass(message: impl Into<String>, duration_ms: u64) -> Self {
        Outcome {
            status: Status::Pass,
            message: message.into(),
            kind: None,
            duration_ms,
        }
    }

    /// A failed check, reported as FAIL or WARN depending on severity.
    pub fn failed(error: &CheckError, advisory: bool, duration_ms: u64) -> Self {
        Outcome {
            status: if advisory { Status::Warn } else { Status::Fail },
            message: error.to_string(),
            kind: Some(error.kind()),
            duration_ms,
        }
    }

    pub fn skipped(error: &CheckError) -> Self {
        Outcome {
            status: Status::Skip,
            message: error.to_string(),
            kind: Some(error.kind()),
            duration_ms: 0,
        }
    }

    pub fn panicked(message: impl Into<String>, duration_ms: u64) -> Self {
        Outcome {
            status: Status::Fail,
            message: message.into(),
            kind: Some(FailureKind::Panicked),
            duration_ms,
        }
    }
}

/// One immutable, sequenced result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    check_id: String,
    description: String,
    status: Status,
    message: String,
    kind: Option<FailureKind>,
    sequence: usize,
    duration_ms: u64,
}

impl CheckResult {
    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure classification; `None` for passes.
    pub fn kind(&self) -> Option<FailureKind> {
        self.kind
    }

    /// Zero-based position in the report.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Result summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub passed: u32,
    pub warned: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total: u32,
}

/// Append-only result list for one run.
#[derive(Debug)]
pub struct ResultCollector {
    suite: String,
    context: TargetContext,
    declared: usize,
    results: Vec<CheckResult>,
}

impl ResultCollector {
    pub fn new(suite: &str, context: TargetContext, declared: usize) -> Self {
        ResultCollector {
            suite: suite.to_string(),
            context,
            declared,
            results: Vec::with_capacity(declared),
        }
    }

    /// Record the outcome for `check` and assign it the next sequence index.
    pub fn record(&mut self, check: &Check, outcome: Outcome) -> &CheckResult {
        let sequence = self.results.len();
        self.results.push(CheckResult {
            check_id: check.id.clone(),
            description: check.description.clone(),
            status: outcome.status,
            message: outcome.message,
            kind: outcome.kind,
            sequence,
            duration_ms: outcome.duration_ms,
        });
        &self.results[sequence]
    }

    pub fn get(&self, check_id: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.check_id == check_id)
    }

    pub fn finish(self, cancelled: bool, total_duration_ms: u64) -> RunReport {
        RunReport {
            suite: self.suite,
            context: self.context,
            declared: self.declared,
            results: self.results,
            cancelled,
            total_duration_ms,
        }
    }
}

/// The finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    suite: String,
    context: TargetContext,
    declared: usize,
    results: Vec<CheckResult>,
    cancelled: bool,
    total_duration_ms: u64,
}

impl RunReport {
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// The targets the run was pointed at.
    pub fn context(&self) -> &TargetContext {
        &self.context
    }

    /// Results in declaration order.
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn get(&self, check_id: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.check_id == check_id)
    }

    /// Number of checks in the suite, including any a cancelled run never
    /// reached.
    pub fn declared(&self) -> usize {
        self.declared
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    pub fn summary(&self) -> ResultSummary {
        let mut summary = ResultSummary::default();

        for result in &self.results {
            summary.total += 1;
            match result.status {
                Status::Pass => summary.passed += 1,
                Status::Warn => summary.warned += 1,
                Status::Fail => summary.failed += 1,
                Status::Skip => summary.skipped += 1,
            }
        }

        summary
    }

    pub fn failures(&self) -> Vec<&CheckResult> {
        self.with_status(Status::Fail)
    }

    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.with_status(Status::Warn)
    }

    fn with_status(&self, status: Status) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| r.status == status).collect()
    }

    /// True when no result is FAIL. WARN and SKIP never count against a run.
    pub fn is_success(&self) -> bool {
        !self.results.iter().any(|r| r.status == Status::Fail)
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}
