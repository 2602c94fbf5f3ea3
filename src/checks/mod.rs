//! Check declarations.
//!
//! A check is inert data: where to look, which region to carve out, what must
//! hold there, how much a failure matters, and which earlier check it relies
//! on. Nothing in this module performs I/O; the engine interprets checks.
//!
//! - `pattern`: restricted wildcard patterns
//! - `region`: region selectors and extraction
//! - `predicate`: predicates and their evaluation
//! - `suite`: ordered, validated check collections
//! - `file`: TOML suite files
//! - `builtin`: the default suite for the conventional application layout

pub mod builtin;
pub mod file;
pub mod pattern;
pub mod predicate;
pub mod region;
pub mod suite;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::platform::probe::HttpMethod;
use crate::Severity;

pub use predicate::{Evidence, Predicate};
pub use region::{Region, RegionSelector};
pub use suite::{Suite, SuiteBuilder};

/// An HTTP endpoint to probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointTarget {
    /// URL template, e.g. `{base_url}/health`
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Overrides the run-wide probe timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl EndpointTarget {
    pub fn new(url: &str) -> Self {
        EndpointTarget {
            url: url.to_string(),
            method: HttpMethod::Get,
            headers: BTreeMap::new(),
            timeout_ms: None,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Where a check gets its data from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// A local text artifact. Relative paths are resolved against the root.
    File { path: String },
    Endpoint(EndpointTarget),
}

impl Target {
    pub fn file(path: &str) -> Self {
        Target::File {
            path: path.to_string(),
        }
    }

    pub fn endpoint(url: &str) -> Self {
        Target::Endpoint(EndpointTarget::new(url))
    }

    pub fn is_endpoint(&self) -> bool {
        matches!(self, Target::Endpoint(_))
    }

    /// The unexpanded template, for listings and banners.
    pub fn template(&self) -> &str {
        match self {
            Target::File { path } => path,
            Target::Endpoint(endpoint) => &endpoint.url,
        }
    }
}

/// One named verification rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Check {
    pub id: String,
    pub description: String,
    pub target: Target,
    #[serde(default)]
    pub region: RegionSelector,
    pub predicate: Predicate,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub depends_on: Option<String>,
}

impl Check {
    /// A hard check over the whole target with no dependency.
    pub fn new(id: &str, description: &str, target: Target, predicate: Predicate) -> Self {
        Check {
            id: id.to_string(),
            description: description.to_string(),
            target,
            region: RegionSelector::WholeFile,
            predicate,
            severity: Severity::Hard,
            depends_on: None,
        }
    }

    pub fn region(mut self, region: RegionSelector) -> Self {
        self.region = region;
        self
    }

    pub fn advisory(mut self) -> Self {
        self.severity = Severity::Advisory;
        self
    }

    pub fn depends_on(mut self, id: &str) -> Self {
        self.depends_on = Some(id.to_string());
        self
    }

    pub fn is_advisory(&self) -> bool {
        self.severity == Severity::Advisory
    }
}
