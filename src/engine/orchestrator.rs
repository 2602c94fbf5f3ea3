//! Check execution orchestrator.
//!
//! Runs a suite in declaration order, enforces dependency-driven skipping and
//! the primary-artifact precondition, and returns an explicit [`RunReport`].
//!
//! # Graceful Degradation
//!
//! - A failing, timed-out or panicking check degrades only its own result
//! - A check whose dependency FAILed or was SKIPped is SKIPped without
//!   touching its target
//! - A missing primary artifact aborts the run before any check executes
//! - Cancellation stops the run before the next check (or wave) starts;
//!   checks that never started produce no result

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::checks::{Check, Suite};
use crate::engine::executor::Executor;
use crate::engine::result::{Outcome, ResultCollector, RunReport};
use crate::platform::artifact::{ArtifactLocator, ArtifactReader};
use crate::platform::probe::ProbeClient;
use crate::{CheckError, GateError, Status};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub parallel: bool,
    pub max_parallel: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            parallel: false,
            max_parallel: 4,
        }
    }
}

/// External stop signal, shared between the caller and a running
/// orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Check orchestrator
pub struct Orchestrator {
    config: OrchestratorConfig,
    locator: ArtifactLocator,
    reader: Arc<dyn ArtifactReader>,
    probe: Arc<dyn ProbeClient>,
    cancel: CancelToken,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        locator: ArtifactLocator,
        reader: Arc<dyn ArtifactReader>,
        probe: Arc<dyn ProbeClient>,
    ) -> Self {
        Orchestrator {
            config,
            locator,
            reader,
            probe,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run every check in `suite`.
    ///
    /// Only a missing (or unresolvable) primary artifact is an `Err`; every
    /// per-check problem ends up in the report.
    pub fn run(&self, suite: &Suite) -> Result<RunReport, GateError> {
        let start = Instant::now();
        tracing::info!(
            suite = suite.name(),
            checks = suite.len(),
            parallel = self.config.parallel,
            "starting run"
        );

        self.check_primary(suite)?;

        let mut collector =
            ResultCollector::new(suite.name(), self.locator.context().clone(), suite.len());

        let cancelled = if self.config.parallel {
            self.run_parallel(suite, &mut collector)
        } else {
            self.run_sequential(suite, &mut collector)
        };

        let report = collector.finish(cancelled, start.elapsed().as_millis() as u64);
        let summary = report.summary();
        tracing::info!(
            passed = summary.passed,
            warned = summary.warned,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled,
            "run finished"
        );
        Ok(report)
    }

    fn check_primary(&self, suite: &Suite) -> Result<(), GateError> {
        let Some(template) = suite.primary() else {
            return Ok(());
        };
        let path = self
            .locator
            .resolve_path(template)
            .map_err(|e| GateError::InvalidCheck {
                check: "primary_artifact".to_string(),
                reason: e.to_string(),
            })?;
        if !self.reader.exists(&path) {
            tracing::error!(path = %path.display(), "primary artifact missing");
            return Err(GateError::PrimaryArtifactMissing { path });
        }
        Ok(())
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(&self.locator, self.reader.as_ref(), self.probe.as_ref())
    }

    /// Run checks sequentially. Returns true if the run was cancelled.
    fn run_sequential(&self, suite: &Suite, collector: &mut ResultCollector) -> bool {
        let executor = self.executor();

        for check in suite.checks() {
            if self.cancel.is_cancelled() {
                tracing::warn!(next = %check.id, "run cancelled");
                return true;
            }

            let dependency = check
                .depends_on
                .as_deref()
                .and_then(|dep| collector.get(dep).map(|r| (dep, r.status())));

            let outcome = match dependency_gate(dependency) {
                Some(skip) => skip,
                None => executor.execute(check),
            };
            log_outcome(check, &outcome);
            collector.record(check, outcome);
        }

        false
    }

    /// Run independent checks in waves of scoped threads.
    ///
    /// A check joins a wave only once its dependency has a result. Outcomes
    /// are buffered per declaration slot and replayed into the collector in
    /// declaration order, so the report matches a sequential run.
    fn run_parallel(&self, suite: &Suite, collector: &mut ResultCollector) -> bool {
        let executor = self.executor();
        let checks = suite.checks();
        let max_parallel = self.config.max_parallel.max(1);

        let mut slots: Vec<Option<Outcome>> = vec![None; checks.len()];
        let mut statuses: Vec<Option<Status>> = vec![None; checks.len()];
        let mut next = 0usize;
        let mut cancelled = false;

        while next < checks.len() {
            if self.cancel.is_cancelled() {
                tracing::warn!(next = %checks[next].id, "run cancelled");
                cancelled = true;
                break;
            }

            let mut wave: Vec<usize> = Vec::with_capacity(max_parallel);
            for index in next..checks.len() {
                if wave.len() == max_parallel {
                    break;
                }
                if statuses[index].is_some() {
                    continue;
                }
                let check = &checks[index];

                let dependency = match check.depends_on.as_deref() {
                    None => None,
                    Some(dep) => match suite.index_of(dep).and_then(|i| statuses[i]) {
                        Some(status) => Some((dep, status)),
                        // Dependency still pending: strict barrier.
                        None => continue,
                    },
                };

                match dependency_gate(dependency) {
                    Some(skip) => {
                        statuses[index] = Some(skip.status);
                        slots[index] = Some(skip);
                    }
                    None => wave.push(index),
                }
            }

            let finished: Vec<(usize, Outcome)> = thread::scope(|scope| {
                let handles: Vec<_> = wave
                    .iter()
                    .map(|&index| {
                        let executor = &executor;
                        let check = &checks[index];
                        (index, scope.spawn(move || executor.execute(check)))
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(index, handle)| {
                        let outcome = handle.join().unwrap_or_else(|_| {
                            Outcome::panicked("check panicked: worker thread aborted", 0)
                        });
                        (index, outcome)
                    })
                    .collect()
            });

            for (index, outcome) in finished {
                statuses[index] = Some(outcome.status);
                slots[index] = Some(outcome);
            }

            while next < checks.len() {
                let Some(outcome) = slots[next].take() else {
                    break;
                };
                log_outcome(&checks[next], &outcome);
                collector.record(&checks[next], outcome);
                next += 1;
            }
        }

        // Checks that finished ahead of a cancelled gap still ran.
        for (check, slot) in checks.iter().zip(slots.iter_mut()).skip(next) {
            if let Some(outcome) = slot.take() {
                log_outcome(check, &outcome);
                collector.record(check, outcome);
            }
        }

        cancelled
    }
}

/// SKIP outcome for a check whose dependency did not hold, if any.
fn dependency_gate(dependency: Option<(&str, Status)>) -> Option<Outcome> {
    let (dependency, status) = dependency?;
    let verb = match status {
        Status::Fail => "failed",
        Status::Skip => "skipped",
        Status::Pass | Status::Warn => return None,
    };
    Some(Outcome::skipped(&CheckError::DependencySkipped {
        dependency: dependency.to_string(),
        verb,
    }))
}

fn log_outcome(check: &Check, outcome: &Outcome) {
    match outcome.status {
        Status::Warn => tracing::warn!(
            check = %check.id,
            message = %outcome.message,
            "advisory check did not hold"
        ),
        _ => tracing::debug!(
            check = %check.id,
            status = %outcome.status,
            duration_ms = outcome.duration_ms,
            "check finished"
        ),
    }
}
