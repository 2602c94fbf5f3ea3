//! Generic check executor.
//!
//! One interpreter for every check: resolve the target, read the file or
//! probe the endpoint, carve the region, evaluate the predicate and classify
//! the outcome by severity. Nothing here knows about other checks.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::checks::region;
use crate::checks::{Check, Evidence};
use crate::engine::result::Outcome;
use crate::platform::artifact::{ArtifactLocator, ArtifactReader, ResolvedTarget};
use crate::platform::probe::{ProbeClient, ProbeRequest, ProbeResponse, TransportErrorKind};
use crate::CheckError;

/// Runs single checks against a reader and a probe client.
pub struct Executor<'a> {
    locator: &'a ArtifactLocator,
    reader: &'a dyn ArtifactReader,
    probe: &'a dyn ProbeClient,
}

impl<'a> Executor<'a> {
    pub fn new(
        locator: &'a ArtifactLocator,
        reader: &'a dyn ArtifactReader,
        probe: &'a dyn ProbeClient,
    ) -> Self {
        Executor {
            locator,
            reader,
            probe,
        }
    }

    /// Execute `check` and classify the outcome.
    ///
    /// Never panics: a panic raised while evaluating (typically from a custom
    /// evaluator) becomes a FAIL for this check.
    pub fn execute(&self, check: &Check) -> Outcome {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.evaluate(check)));
        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(message)) => Outcome::pass(message, elapsed),
            Ok(Err(error)) => Outcome::failed(&error, check.is_advisory(), elapsed),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(check = %check.id, %reason, "check panicked");
                Outcome::panicked(format!("check panicked: {}", reason), elapsed)
            }
        }
    }

    fn evaluate(&self, check: &Check) -> Result<String, CheckError> {
        match self.locator.resolve(&check.target)? {
            ResolvedTarget::LocalText { path } => {
                let text = self.reader.read_text(&path)?;
                let region = region::extract(&check.region, &text);
                check.predicate.evaluate(&Evidence {
                    region: &region,
                    status: None,
                })
            }
            ResolvedTarget::Remote(request) => {
                let response = self.probe.probe(&request);
                self.evaluate_response(check, &request, &response)
            }
        }
    }

    fn evaluate_response(
        &self,
        check: &Check,
        request: &ProbeRequest,
        response: &ProbeResponse,
    ) -> Result<String, CheckError> {
        let Some(status) = response.status else {
            // No response at all: never a status mismatch.
            return Err(transport_error(request, response));
        };

        if check.predicate.reads_body() {
            if !response.is_success() {
                return Err(CheckError::mismatch(format!(
                    "status {} from {} (expected 2xx)",
                    status, request.url
                )));
            }
            if let Some(error) = &response.transport_error {
                return Err(match error.kind {
                    TransportErrorKind::Timeout => CheckError::Timeout {
                        url: request.url.clone(),
                        timeout_ms: request.timeout_ms(),
                    },
                    _ => CheckError::MalformedPayload {
                        reason: error.message.clone(),
                    },
                });
            }
        }

        let region = region::extract(&check.region, &response.body);
        check.predicate.evaluate(&Evidence {
            region: &region,
            status: Some(status),
        })
    }
}

fn transport_error(request: &ProbeRequest, response: &ProbeResponse) -> CheckError {
    match &response.transport_error {
        Some(error) => match error.kind {
            TransportErrorKind::Timeout => CheckError::Timeout {
                url: request.url.clone(),
                timeout_ms: request.timeout_ms(),
            },
            TransportErrorKind::Unreachable => CheckError::Unreachable {
                url: request.url.clone(),
                reason: error.message.clone(),
            },
            TransportErrorKind::Protocol => CheckError::InvalidTarget {
                target: request.url.clone(),
                reason: error.message.clone(),
            },
        },
        None => CheckError::Unreachable {
            url: request.url.clone(),
            reason: "no response".to_string(),
        },
    }
}
