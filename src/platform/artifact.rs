//! Artifact location and reading.
//!
//! Targets are templates. The locator expands `{base_url}`,
//! `{frontend_url}`, `{root}` and `{entity}` and decides whether the result
//! is a local file or a remote endpoint. Files are read fresh for every
//! check; nothing is cached between checks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checks::Target;
use crate::config::GateConfig;
use crate::platform::probe::ProbeRequest;
use crate::CheckError;

/// Values available to target templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetContext {
    pub base_url: String,
    pub frontend_url: String,
    pub root: PathBuf,
    pub entity: String,
}

impl TargetContext {
    pub fn new(base_url: &str, frontend_url: &str, root: impl Into<PathBuf>, entity: &str) -> Self {
        TargetContext {
            base_url: base_url.trim_end_matches('/').to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            root: root.into(),
            entity: entity.to_string(),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(
            &config.base_url,
            &config.frontend_url,
            config.root.clone(),
            &config.entity,
        )
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "base_url" => Some(self.base_url.clone()),
            "frontend_url" => Some(self.frontend_url.clone()),
            "root" => Some(self.root.display().to_string()),
            "entity" => Some(self.entity.clone()),
            _ => None,
        }
    }
}

/// Where a check's data comes from once its template is expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    LocalText { path: PathBuf },
    Remote(ProbeRequest),
}

/// Resolves target descriptors against a [`TargetContext`].
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    context: TargetContext,
    default_timeout: Duration,
}

impl ArtifactLocator {
    pub fn new(context: TargetContext, default_timeout: Duration) -> Self {
        ArtifactLocator {
            context,
            default_timeout,
        }
    }

    pub fn context(&self) -> &TargetContext {
        &self.context
    }

    /// Expand every `{name}` placeholder in `template`.
    pub fn expand(&self, template: &str) -> Result<String, CheckError> {
        let invalid = |reason: String| CheckError::InvalidTarget {
            target: template.to_string(),
            reason,
        };

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| invalid("unterminated placeholder".to_string()))?;
            let name = &after[..close];
            let value = self
                .context
                .lookup(name)
                .ok_or_else(|| invalid(format!("unknown placeholder '{{{}}}'", name)))?;
            out.push_str(&value);
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Expand a file template and anchor relative paths at the root.
    pub fn resolve_path(&self, template: &str) -> Result<PathBuf, CheckError> {
        let expanded = self.expand(template)?;
        if expanded.is_empty() {
            return Err(CheckError::InvalidTarget {
                target: template.to_string(),
                reason: "empty path".to_string(),
            });
        }
        Ok(self.context.root.join(expanded))
    }

    pub fn resolve(&self, target: &Target) -> Result<ResolvedTarget, CheckError> {
        match target {
            Target::File { path } => Ok(ResolvedTarget::LocalText {
                path: self.resolve_path(path)?,
            }),
            Target::Endpoint(endpoint) => {
                let url = self.expand(&endpoint.url)?;
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(CheckError::InvalidTarget {
                        target: endpoint.url.clone(),
                        reason: format!("'{}' is not an http(s) URL", url),
                    });
                }
                let headers = endpoint
                    .headers
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), self.expand(value)?)))
                    .collect::<Result<Vec<_>, CheckError>>()?;
                Ok(ResolvedTarget::Remote(ProbeRequest {
                    url,
                    method: endpoint.method,
                    headers,
                    timeout: endpoint
                        .timeout_ms
                        .map(Duration::from_millis)
                        .unwrap_or(self.default_timeout),
                }))
            }
        }
    }
}

/// Reads local text artifacts.
pub trait ArtifactReader: Send + Sync {
    fn read_text(&self, path: &Path) -> Result<String, CheckError>;

    fn exists(&self, path: &Path) -> bool;
}

/// Reads straight from the filesystem on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl ArtifactReader for FsReader {
    fn read_text(&self, path: &Path) -> Result<String, CheckError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CheckError::ArtifactNotFound {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(CheckError::InvalidTarget {
                target: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}
