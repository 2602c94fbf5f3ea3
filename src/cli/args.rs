//! Command line arguments.
//!
//! Every value is optional here so that [`GateConfig`](crate::GateConfig)
//! can tell "not given" apart from a default and merge in precedence order:
//! command line, then environment, then config file, then defaults.

use std::path::PathBuf;

use clap::Parser;

/// Release gate: verify source artifacts and live endpoints against declared
/// contracts.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "verigate", version, about, long_about = None)]
pub struct Args {
    /// Backend base URL [default: http://localhost:8000]
    #[arg(env = "VERIGATE_BASE_URL", value_name = "BASE_URL")]
    pub base_url: Option<String>,

    /// Filesystem root of the application [default: .]
    #[arg(env = "VERIGATE_ROOT", value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Entity id substituted for {entity}, e.g. a session id [default: latest]
    #[arg(env = "VERIGATE_ENTITY", value_name = "ENTITY")]
    pub entity: Option<String>,

    /// Front-end server URL [default: http://localhost:3000]
    #[arg(long, env = "VERIGATE_FRONTEND_URL", value_name = "URL")]
    pub frontend_url: Option<String>,

    /// TOML suite file to run instead of the built-in suite
    #[arg(long, value_name = "FILE")]
    pub suite: Option<PathBuf>,

    /// TOML configuration file [default: ROOT/verigate.toml if present]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-probe timeout in milliseconds [default: 10000]
    #[arg(long, env = "VERIGATE_TIMEOUT_MS", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Run independent checks concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Worker limit for --parallel [default: 4]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_parallel: Option<u16>,

    /// Show elapsed time and failure kind for every check
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// List the suite's checks and exit
    #[arg(long)]
    pub list: bool,
}
