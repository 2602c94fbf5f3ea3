//! TOML suite files.
//!
//! ```toml
//! name = "dashboard"
//! primary_artifact = "frontend/src/pages/Dashboard.tsx"
//!
//! [[checks]]
//! id = "UI-001"
//! description = "Leaderboard is rendered"
//! target = { kind = "file", path = "frontend/src/pages/Dashboard.tsx" }
//! predicate = { kind = "contains", pattern = "Leaderboard" }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::checks::{Check, Suite};
use crate::GateError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    primary_artifact: Option<String>,
    #[serde(default)]
    checks: Vec<Check>,
}

/// Read and validate a suite file.
pub fn load_suite(path: &Path) -> Result<Suite, GateError> {
    let text = std::fs::read_to_string(path).map_err(|e| GateError::SuiteFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "loaded suite file");
    parse_suite(&text, path)
}

/// Parse suite text; `origin` names the source in errors and supplies the
/// default suite name.
pub fn parse_suite(text: &str, origin: &Path) -> Result<Suite, GateError> {
    let file: SuiteFile = toml::from_str(text).map_err(|e| GateError::SuiteFile {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;

    let name = file.name.unwrap_or_else(|| {
        origin
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "suite".to_string())
    });

    let mut builder = Suite::builder(&name).checks(file.checks);
    if let Some(primary) = file.primary_artifact {
        builder = builder.primary_artifact(&primary);
    }
    builder.build()
}
