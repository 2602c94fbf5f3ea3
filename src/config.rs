//! Run configuration.
//!
//! Values are merged in precedence order: command line, environment (both
//! handled by clap), the TOML config file, then built-in defaults.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::args::Args;
use crate::GateError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_ROOT: &str = ".";
pub const DEFAULT_ENTITY: &str = "latest";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Looked up in the root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "verigate.toml";

/// Contents of a `verigate.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub frontend_url: Option<String>,
    pub entity: Option<String>,
    /// Suite file, relative to the root
    pub suite: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub parallel: Option<bool>,
    pub max_parallel: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, GateError> {
        let text = std::fs::read_to_string(path).map_err(|e| GateError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, origin: &Path) -> Result<Self, GateError> {
        toml::from_str(text).map_err(|e| GateError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub base_url: String,
    pub frontend_url: String,
    pub root: PathBuf,
    pub entity: String,
    /// Suite file; the built-in suite runs when unset
    pub suite_file: Option<PathBuf>,
    pub timeout_ms: u64,
    pub parallel: bool,
    pub max_parallel: usize,
    pub verbose: bool,
    pub color: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            root: PathBuf::from(DEFAULT_ROOT),
            entity: DEFAULT_ENTITY.to_string(),
            suite_file: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            parallel: false,
            max_parallel: DEFAULT_MAX_PARALLEL,
            verbose: false,
            color: false,
        }
    }
}

impl GateConfig {
    /// Resolve the configuration for a command line, reading the config file
    /// it names (or the implicit one in the root).
    pub fn from_args(args: &Args) -> Result<Self, GateError> {
        let root = args
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => {
                let implicit = root.join(CONFIG_FILE_NAME);
                if implicit.is_file() {
                    tracing::debug!(path = %implicit.display(), "using config file");
                    FileConfig::load(&implicit)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let mut config = Self::merge(args, file);
        config.color = color_enabled(args.no_color);
        Ok(config)
    }

    /// Layer command-line values over file values over defaults. Color is
    /// left off.
    pub fn merge(args: &Args, file: FileConfig) -> Self {
        let defaults = GateConfig::default();

        GateConfig {
            base_url: args
                .base_url
                .clone()
                .or(file.base_url)
                .unwrap_or(defaults.base_url),
            frontend_url: args
                .frontend_url
                .clone()
                .or(file.frontend_url)
                .unwrap_or(defaults.frontend_url),
            root: args.root.clone().unwrap_or(defaults.root),
            entity: args
                .entity
                .clone()
                .or(file.entity)
                .unwrap_or(defaults.entity),
            suite_file: args.suite.clone().or(file.suite),
            timeout_ms: args
                .timeout_ms
                .or(file.timeout_ms)
                .unwrap_or(defaults.timeout_ms),
            parallel: args.parallel || file.parallel.unwrap_or(defaults.parallel),
            max_parallel: args
                .max_parallel
                .map(usize::from)
                .or(file.max_parallel)
                .unwrap_or(defaults.max_parallel)
                .max(1),
            verbose: args.verbose,
            // Terminal detection happens in `from_args`.
            color: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Color only on a terminal, and never when `--no-color` or `NO_COLOR` is set.
fn color_enabled(no_color: bool) -> bool {
    !no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}
