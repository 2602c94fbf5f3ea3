//! Ordered, validated check collections.

use std::collections::HashSet;

use crate::checks::{Check, Target};
use crate::GateError;

/// Checks in declaration order, plus the artifact the whole suite requires.
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    primary: Option<String>,
    checks: Vec<Check>,
}

impl Suite {
    pub fn builder(name: &str) -> SuiteBuilder {
        SuiteBuilder {
            name: name.to_string(),
            primary: None,
            checks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path template of the primary artifact, if the suite has one.
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.checks.iter().position(|c| c.id == id)
    }
}

/// Assembles a [`Suite`] and enforces its invariants on `build`.
#[derive(Debug, Clone)]
pub struct SuiteBuilder {
    name: String,
    primary: Option<String>,
    checks: Vec<Check>,
}

impl SuiteBuilder {
    /// Require this local file before any check runs.
    pub fn primary_artifact(mut self, path: &str) -> Self {
        self.primary = Some(path.to_string());
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn checks(mut self, checks: impl IntoIterator<Item = Check>) -> Self {
        self.checks.extend(checks);
        self
    }

    /// Validate and freeze the suite.
    ///
    /// Ids must be unique and non-empty, a dependency must name a check
    /// declared earlier, and every predicate must make sense for its target.
    pub fn build(self) -> Result<Suite, GateError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.checks.len());

        for check in &self.checks {
            if check.id.trim().is_empty() {
                return Err(GateError::InvalidCheck {
                    check: check.description.clone(),
                    reason: "check id must not be empty".to_string(),
                });
            }

            if let Some(dependency) = &check.depends_on {
                if !seen.contains(dependency.as_str()) {
                    return Err(GateError::UnknownDependency {
                        check: check.id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }

            if !seen.insert(check.id.as_str()) {
                return Err(GateError::DuplicateCheckId(check.id.clone()));
            }

            check
                .predicate
                .validate()
                .map_err(|reason| GateError::InvalidCheck {
                    check: check.id.clone(),
                    reason,
                })?;

            if matches!(check.target, Target::File { .. }) && check.predicate.is_status_only() {
                return Err(GateError::InvalidCheck {
                    check: check.id.clone(),
                    reason: "status predicates need an endpoint target".to_string(),
                });
            }
        }

        Ok(Suite {
            name: self.name,
            primary: self.primary,
            checks: self.checks,
        })
    }
}
