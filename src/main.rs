//! verigate CLI entry point
//!
//! Release gate for multi-tier applications.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use verigate::cli::args::Args;
use verigate::cli::output::{format_check_list, OutputFormatter, TerminalFormatter};
use verigate::cli::signal::cancel_on_stop_signal;
use verigate::engine::orchestrator::CancelToken;
use verigate::{load_suite, run_gate, GateConfig, GateError};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version land here too.
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(args.verbose);

    let config = match GateConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => return report_error(&e),
    };

    if args.list {
        return match load_suite(&config) {
            Ok(suite) => {
                print!("{}", format_check_list(&suite));
                ExitCode::SUCCESS
            }
            Err(e) => report_error(&e),
        };
    }

    run_checks(&config)
}

/// Diagnostics go to stderr; `VERIGATE_LOG` overrides the level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("VERIGATE_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run_checks(config: &GateConfig) -> ExitCode {
    let cancel = CancelToken::new();
    if let Err(e) = cancel_on_stop_signal(cancel.clone()) {
        tracing::warn!(error = %e, "stop signals will not cancel the run");
    }

    let report = match run_gate(config, cancel) {
        Ok(report) => report,
        Err(e) => return report_error(&e),
    };

    let formatter = TerminalFormatter::new(config.color, config.verbose);
    println!("{}", formatter.format(&report));

    ExitCode::from(report.exit_code())
}

fn report_error(error: &GateError) -> ExitCode {
    eprintln!("Error: {}", error);
    if matches!(error, GateError::PrimaryArtifactMissing { .. }) {
        eprintln!("No checks were run.");
    }
    ExitCode::from(1)
}
